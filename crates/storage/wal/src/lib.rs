//! The write-ahead log.
//!
//! Log records describe every record page mutation performed by a
//! transaction, plus the transaction lifecycle events themselves. The log
//! manager appends records into a dedicated buffer of log pages, splitting
//! a record across page slots when it exceeds the remaining space of a
//! page. Records are immutable once appended and are read back by the
//! location returned from the append.

mod errors;

/// The log record and its codec.
pub mod log_record;

/// The log manager.
pub mod manager;

pub use errors::{LogRecordCorruptError, LogRecordParseError, WalError};
