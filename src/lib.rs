//! # Granary
//!
//! An embeddable storage engine that persists variable length records on
//! block oriented backing storage with undo based transaction semantics.
//!
//! The engine is composed of the storage crates under `/crates/storage`
//! of this workspace:
//!
//! - `binary-helpers`: little-endian codecs and checksums.
//! - `page`: slotted record pages and write-ahead log pages.
//! - `file`: disk and in-memory page storage plus the free space list.
//! - `buffer`: the page cache with pluggable replacement.
//! - `wal`: log records and the log manager.
//! - `txn`: transactions and the transaction manager.
//! - `storage-api`: the chained-slot record manager.
//!
//! This crate wires them into a [`Store`]: open it from a connection
//! string (`file://` or `memory://`), begin transactions, and work with
//! records or the [`List`] collection built on top of them.
//!
//! ```no_run
//! use granary::{Store, StoreConfig};
//!
//! let store = Store::open("file://data/example", StoreConfig::default())?;
//! let mut txn = store.begin()?;
//! let location = store.insert(&mut txn, b"hello")?;
//! store.commit(&mut txn, true)?;
//!
//! let txn = store.begin()?;
//! assert_eq!(store.read(&txn, location)?, b"hello");
//! # Ok::<(), granary::Error>(())
//! ```

mod config;
mod connection;
mod errors;

/// The list collection.
pub mod list;

/// The store facade.
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use connection::{ConnectionString, Scheme};
pub use errors::Error;
pub use list::List;
pub use store::Store;

pub use page::location::{LogLocation, PageId, RecordLocation, SeqNumber, SlotId, TransactionId};
pub use txn::transaction::{Transaction, TransactionState};
