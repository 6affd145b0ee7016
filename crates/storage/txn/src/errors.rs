use buffer::BufferError;
use page::errors::page_error::PageError;
use thiserror::Error;
use wal::WalError;

/// Errors surfaced by transaction processing.
#[derive(Debug, Error)]
pub enum TxnError {
    #[error("write-ahead log error")]
    Wal(#[from] WalError),
    #[error("buffer error")]
    Buffer(#[from] BufferError),
    #[error("page error")]
    Page(#[from] PageError),
}
