use buffer::BufferError;
use page::errors::page_error::PageError;
use page::location::RecordLocation;
use thiserror::Error;
use txn::TxnError;

/// Errors surfaced by the record manager.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no record at location {0}")]
    NotFound(RecordLocation),
    #[error("record chain starting at {0} is corrupt")]
    Corrupt(RecordLocation),
    #[error("record manager has not been started")]
    NotStarted,
    #[error("buffer error")]
    Buffer(#[from] BufferError),
    #[error("page error")]
    Page(#[from] PageError),
    #[error("transaction error")]
    Txn(#[from] TxnError),
}
