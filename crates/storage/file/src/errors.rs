use binary_helpers::bin_error::BinaryError;
use page::errors::page_error::PageError;
use page::location::PageId;
use page::page::MINIMUM_PAGE_SIZE;
use thiserror::Error;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failure")]
    Io(#[from] std::io::Error),
    #[error("page {0} not found in storage")]
    PageNotFound(PageId),
    #[error("the null page id 0 does not address a page")]
    InvalidPageId,
    #[error("page size {size} is below the minimum of {MINIMUM_PAGE_SIZE}")]
    InvalidPageSize { size: usize },
    #[error("storage has not been opened")]
    NotOpen,
    #[error("failed to parse storage file header")]
    HeaderParse(#[source] BinaryError),
    #[error("failed to parse free space list")]
    FslParse(#[source] BinaryError),
    #[error("free space list corrupt: stored checksum {stored:#010x}, computed {computed:#010x}")]
    FslCorrupt { stored: u32, computed: u32 },
    #[error("failed to materialize page")]
    Page(#[from] PageError),
}
