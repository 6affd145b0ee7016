//! Public API of a storage backend.

use crate::errors::StorageError;
use crate::fsl::FreeSpaceList;
use page::location::PageId;
use page::page::Page;

/// Byte-level page storage.
///
/// A `Storage` manages a collection of fixed-size pages addressed by
/// `PageId`, plus one free space list snapshot stored beside the pages.
/// Reads and writes are page aligned: a page is either fully readable or
/// the read fails, callers never observe torn pages.
pub trait Storage<P: Page>: std::fmt::Debug {
    /// Opens the backend. On a fresh backend the configured page size is
    /// persisted; on an existing one the stored page size is adopted and
    /// the page count derived from the stored content.
    fn open(&mut self) -> Result<(), StorageError>;

    /// Whether the backend is open.
    fn is_open(&self) -> bool;

    /// Closes the backend. No-op when not open.
    fn close(&mut self) -> Result<(), StorageError>;

    /// Closes the backend and deletes its backing files.
    fn remove(&mut self) -> Result<(), StorageError>;

    /// The page size all pages in this backend share.
    fn page_size(&self) -> usize;

    /// Number of pages allocated so far.
    fn page_count(&self) -> u64;

    /// Allocates the next page id. No bytes are written for the new page
    /// until it is first flushed.
    fn allocate(&mut self) -> PageId;

    /// Reads and materializes the page with the given id.
    ///
    /// Fails with [`StorageError::PageNotFound`] when the page's offset
    /// lies past the end of the stored content.
    fn read(&mut self, page_id: PageId) -> Result<P, StorageError>;

    /// Serializes and persists the page at its computed offset. Writing a
    /// page with the null id fails.
    fn write(&mut self, page: &P) -> Result<(), StorageError>;

    /// Loads the persisted free space list, empty when none was stored.
    fn read_fsl(&mut self) -> Result<FreeSpaceList, StorageError>;

    /// Persists the free space list snapshot.
    fn write_fsl(&mut self, fsl: &FreeSpaceList) -> Result<(), StorageError>;
}
