//! The free space list.
//!
//! A set of page ids known to accept new inserts. It is persisted
//! separately from the data pages so bookkeeping updates never touch page
//! images, and reloaded when the buffer manager starts. Callers must not
//! rely on which member is handed out, only that it has insert space; the
//! fixed policy picks the tail of the set, which biases towards recently
//! allocated pages.

use crate::errors::StorageError;
use binary_helpers::checksum::checksum;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use page::location::PageId;
use std::collections::BTreeSet;

/// Ordered set of pages with insertable free space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeSpaceList {
    pages: BTreeSet<PageId>,
}

impl FreeSpaceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a page as having insert space. Duplicates are absorbed.
    pub fn insert(&mut self, page_id: PageId) {
        self.pages.insert(page_id);
    }

    /// Drops a page that ran out of insert space.
    pub fn erase(&mut self, page_id: PageId) {
        self.pages.remove(&page_id);
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.contains(&page_id)
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// The page an insertion should go to: the tail of the set.
    pub fn pick(&self) -> Option<PageId> {
        self.pages.last().copied()
    }

    /// Snapshot of the members in ascending order.
    pub fn page_ids(&self) -> Vec<PageId> {
        self.pages.iter().copied().collect()
    }

    /// Serialized size: member count, members, checksum.
    pub fn storage_size(&self) -> usize {
        8 + self.pages.len() * 8 + 4
    }

    /// Serializes the list into a standalone byte image.
    pub fn dump(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.storage_size()];
        let mut writer = ByteWriter::new(&mut bytes);
        // Writes into a correctly sized buffer cannot fail.
        writer
            .write::<u64>(self.pages.len() as u64)
            .expect("fsl buffer is sized to fit");
        for page_id in &self.pages {
            writer
                .write::<u64>(*page_id)
                .expect("fsl buffer is sized to fit");
        }
        let crc = checksum(writer.written());
        writer.write::<u32>(crc).expect("fsl buffer is sized to fit");
        bytes
    }

    /// Deserializes a list from its byte image.
    pub fn load(bytes: &[u8]) -> Result<Self, StorageError> {
        let mut reader = ByteReader::new(bytes);
        let count = reader.read::<u64>().map_err(StorageError::FslParse)?;
        let mut pages = BTreeSet::new();
        for _ in 0..count {
            pages.insert(reader.read::<u64>().map_err(StorageError::FslParse)?);
        }
        let covered = reader.consumed();
        let stored = reader.read::<u32>().map_err(StorageError::FslParse)?;
        let computed = checksum(covered);
        if stored != computed {
            return Err(StorageError::FslCorrupt { stored, computed });
        }
        Ok(Self { pages })
    }
}

#[cfg(test)]
mod fsl_tests {
    use super::*;

    #[test]
    fn pick_returns_the_tail() {
        let mut fsl = FreeSpaceList::new();
        assert_eq!(fsl.pick(), None);
        fsl.insert(3);
        fsl.insert(7);
        fsl.insert(5);
        assert_eq!(fsl.pick(), Some(7));
    }

    #[test]
    fn erase_removes_a_member() {
        let mut fsl = FreeSpaceList::new();
        fsl.insert(2);
        fsl.insert(4);
        fsl.erase(4);
        assert!(!fsl.contains(4));
        assert_eq!(fsl.pick(), Some(2));
    }

    #[test]
    fn duplicate_inserts_are_absorbed() {
        let mut fsl = FreeSpaceList::new();
        fsl.insert(1);
        fsl.insert(1);
        assert_eq!(fsl.len(), 1);
    }

    #[test]
    fn list_round_trips() {
        let mut fsl = FreeSpaceList::new();
        for page_id in [9, 1, 4, 20] {
            fsl.insert(page_id);
        }
        let bytes = fsl.dump();
        assert_eq!(FreeSpaceList::load(&bytes).unwrap(), fsl);
    }

    #[test]
    fn empty_list_round_trips() {
        let fsl = FreeSpaceList::new();
        assert_eq!(FreeSpaceList::load(&fsl.dump()).unwrap(), fsl);
    }

    #[test]
    fn corrupted_image_is_rejected() {
        let mut fsl = FreeSpaceList::new();
        fsl.insert(11);
        let mut bytes = fsl.dump();
        bytes[8] ^= 0x01;
        assert!(matches!(
            FreeSpaceList::load(&bytes),
            Err(StorageError::FslCorrupt { .. })
        ));
    }
}
