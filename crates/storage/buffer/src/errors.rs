use file::errors::StorageError;
use page::errors::page_error::PageError;
use page::location::PageId;
use std::error::Error;
use thiserror::Error;

/// Errors surfaced by the buffer manager.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer capacity of {0} page slots is invalid; at least 2 are required")]
    InvalidCapacity(usize),
    #[error("buffer is full and every resident page is pinned")]
    NoEvictablePage,
    #[error("page {0} failed to load; the loading thread reported the cause")]
    LoadFailed(PageId),
    #[error("storage error")]
    Storage(#[from] StorageError),
    #[error("page error")]
    Page(#[from] PageError),
    #[error("write-ahead hook failed before flushing page {page_id}")]
    FlushHook {
        page_id: PageId,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}
