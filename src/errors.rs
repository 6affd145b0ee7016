use crate::config::ConfigError;
use binary_helpers::bin_error::BinaryError;
use buffer::BufferError;
use file::errors::StorageError;
use storage_api::RecordError;
use thiserror::Error;
use txn::TxnError;
use wal::WalError;

/// Top level error type of the store facade.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("collection has not been opened")]
    CollectionNotOpen,
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("record error")]
    Record(#[from] RecordError),
    #[error("transaction error")]
    Txn(#[from] TxnError),
    #[error("buffer error")]
    Buffer(#[from] BufferError),
    #[error("write-ahead log error")]
    Wal(#[from] WalError),
    #[error("storage error")]
    Storage(#[from] StorageError),
    #[error("failed to parse collection node")]
    NodeParse(#[from] BinaryError),
}
