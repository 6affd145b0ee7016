//! In-memory page storage.
//!
//! Pages are still serialized to byte images on write and materialized on
//! read, so parse and corruption behavior matches the disk backend. The
//! content lives only as long as the storage value.

use crate::api::Storage;
use crate::errors::StorageError;
use crate::fsl::FreeSpaceList;
use crate::header::FILE_HEADER_SIZE;
use page::location::PageId;
use page::page::{MINIMUM_PAGE_SIZE, Page};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Page storage over an in-process byte map.
#[derive(Debug)]
pub struct MemoryStorage<P: Page> {
    page_size: usize,
    page_count: u64,
    pages: HashMap<PageId, Vec<u8>>,
    fsl_image: Option<Vec<u8>>,
    open: bool,
    _page: PhantomData<fn() -> P>,
}

impl<P: Page> MemoryStorage<P> {
    pub fn new(page_size: usize) -> Result<Self, StorageError> {
        if page_size < MINIMUM_PAGE_SIZE {
            return Err(StorageError::InvalidPageSize { size: page_size });
        }
        Ok(Self {
            page_size,
            page_count: 0,
            pages: HashMap::new(),
            fsl_image: None,
            open: false,
            _page: PhantomData,
        })
    }

    /// Total size the stored content would occupy on disk. Mirrors the
    /// file layout so size derived behavior stays comparable.
    pub fn content_size(&self) -> u64 {
        FILE_HEADER_SIZE as u64 + self.page_count * self.page_size as u64
    }
}

impl<P: Page> Storage<P> for MemoryStorage<P> {
    fn open(&mut self) -> Result<(), StorageError> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.open = false;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        self.open = false;
        self.pages.clear();
        self.fsl_image = None;
        self.page_count = 0;
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> u64 {
        self.page_count
    }

    fn allocate(&mut self) -> PageId {
        self.page_count += 1;
        self.page_count
    }

    fn read(&mut self, page_id: PageId) -> Result<P, StorageError> {
        if page_id == 0 {
            return Err(StorageError::InvalidPageId);
        }
        if !self.open {
            return Err(StorageError::NotOpen);
        }
        let image = self
            .pages
            .get(&page_id)
            .ok_or(StorageError::PageNotFound(page_id))?;
        Ok(P::load(image)?)
    }

    fn write(&mut self, page: &P) -> Result<(), StorageError> {
        if page.id() == 0 {
            return Err(StorageError::InvalidPageId);
        }
        if !self.open {
            return Err(StorageError::NotOpen);
        }
        let mut image = vec![0u8; self.page_size];
        page.dump(&mut image)?;
        self.pages.insert(page.id(), image);
        Ok(())
    }

    fn read_fsl(&mut self) -> Result<FreeSpaceList, StorageError> {
        match &self.fsl_image {
            Some(image) => FreeSpaceList::load(image),
            None => Ok(FreeSpaceList::new()),
        }
    }

    fn write_fsl(&mut self, fsl: &FreeSpaceList) -> Result<(), StorageError> {
        self.fsl_image = Some(fsl.dump());
        Ok(())
    }
}

#[cfg(test)]
mod memory_storage_tests {
    use super::*;
    use page::log_page::LogPage;
    use page::record_page::RecordPage;

    #[test]
    fn read_of_unwritten_page_is_not_found() {
        let mut storage = MemoryStorage::<RecordPage>::new(512).unwrap();
        storage.open().unwrap();
        let page_id = storage.allocate();
        assert!(matches!(
            storage.read(page_id),
            Err(StorageError::PageNotFound(1))
        ));
    }

    #[test]
    fn written_page_reads_back() {
        let mut storage = MemoryStorage::<RecordPage>::new(512).unwrap();
        storage.open().unwrap();
        let page_id = storage.allocate();
        let page = RecordPage::with_size(page_id, 512);
        storage.write(&page).unwrap();
        assert_eq!(storage.read(page_id).unwrap(), page);
    }

    #[test]
    fn works_for_log_pages_too() {
        let mut storage = MemoryStorage::<LogPage>::new(512).unwrap();
        storage.open().unwrap();
        let page_id = storage.allocate();
        let page = LogPage::with_size(page_id, 512);
        storage.write(&page).unwrap();
        assert_eq!(storage.read(page_id).unwrap(), page);
    }

    #[test]
    fn operations_require_open_storage() {
        let mut storage = MemoryStorage::<RecordPage>::new(512).unwrap();
        assert!(matches!(storage.read(1), Err(StorageError::NotOpen)));
    }

    #[test]
    fn remove_clears_everything() {
        let mut storage = MemoryStorage::<RecordPage>::new(512).unwrap();
        storage.open().unwrap();
        let page_id = storage.allocate();
        storage.write(&RecordPage::with_size(page_id, 512)).unwrap();
        storage.remove().unwrap();
        assert_eq!(storage.page_count(), 0);
        assert!(!storage.is_open());
    }
}
