//! Storage factory.
//!
//! Resolves a storage target to a boxed backend for the requested page
//! type. The page type parameter selects the deserializer, so a backend
//! opened for record pages can never hand out log pages.

use crate::api::Storage;
use crate::disk_storage::FileStorage;
use crate::errors::StorageError;
use crate::memory_storage::MemoryStorage;
use page::page::Page;
use std::path::PathBuf;

/// Where a storage backend keeps its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// A file at the given path.
    File(PathBuf),
    /// Process memory.
    Memory,
}

/// Creates the backend for `target`. The returned storage is not yet
/// open; the buffer manager opens it on start.
pub fn open_storage<P: Page>(
    target: &StorageTarget,
    page_size: usize,
) -> Result<Box<dyn Storage<P> + Send>, StorageError> {
    match target {
        StorageTarget::File(path) => Ok(Box::new(FileStorage::<P>::new(path.clone(), page_size)?)),
        StorageTarget::Memory => Ok(Box::new(MemoryStorage::<P>::new(page_size)?)),
    }
}
