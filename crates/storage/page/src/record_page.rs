//! The slotted data page.
//!
//! # Layout
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────┐
//!   │ Header: page_id, prev/next page id, slot count, span entries  │
//!   ├───────────────────────────────────────────────────────────────┤
//!   │ Free space (zero filled on disk)                              │
//!   ├───────────────────────────────────────────────────────────────┤
//!   │ Slot payloads, packed from the page tail backward             │
//!   └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The header keeps an ordered map from `SlotId` to the `(offset, size)`
//! span of the stored slot. Slots are packed contiguously from the end of
//! the page, so iterating the map in `SlotId` order yields strictly
//! decreasing offsets and the lowest offset is the free space tail.
//!
//! Mutating operations take a [`crate::journal::SlotJournal`] and report
//! the mutation before applying it, which is what makes undo driven
//! rollback possible.

use crate::errors::page_error::PageResult;
use crate::location::{PageId, RecordLocation, SlotId};
use crate::page::{Page, PageOperation};
use crate::record_slot::RecordSlot;
use std::collections::HashMap;

pub(crate) mod codec;
pub(crate) mod header;
pub(crate) mod ops;

use header::RecordPageHeader;

/// A slotted page holding variable length record fragments.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordPage {
    pub(crate) header: RecordPageHeader,
    pub(crate) slots: HashMap<SlotId, RecordSlot>,
}

impl RecordPage {
    /// Linked next page id, `0` when the page is not linked.
    pub fn next_page_id(&self) -> PageId {
        self.header.next_page_id
    }

    /// Sets the linked next page id.
    pub fn set_next_page_id(&mut self, page_id: PageId) {
        self.header.next_page_id = page_id;
    }

    /// Linked previous page id, `0` when the page is not linked.
    pub fn prev_page_id(&self) -> PageId {
        self.header.prev_page_id
    }

    /// Sets the linked previous page id.
    pub fn set_prev_page_id(&mut self, page_id: PageId) {
        self.header.prev_page_id = page_id;
    }

    /// Number of live slots in the page.
    pub fn slot_count(&self) -> usize {
        self.header.spans.len()
    }

    /// The location of the given slot on this page.
    fn location_of(&self, slot_id: SlotId) -> RecordLocation {
        RecordLocation::new(self.header.page_id, slot_id)
    }
}

impl Page for RecordPage {
    fn with_size(page_id: PageId, page_size: usize) -> Self {
        Self {
            header: RecordPageHeader::new(page_id, page_size),
            slots: HashMap::new(),
        }
    }

    fn id(&self) -> PageId {
        self.header.page_id
    }

    fn free_space_size(&self, operation: PageOperation) -> usize {
        let free = self
            .header
            .tail()
            .saturating_sub(self.header.storage_size());
        match operation {
            // A new slot also costs one span entry in the header.
            PageOperation::Insert => free.saturating_sub(RecordPageHeader::SPAN_ENTRY_SIZE),
            PageOperation::Update => free,
        }
    }

    fn storage_size(&self) -> usize {
        self.header.page_size
    }

    fn load(bytes: &[u8]) -> PageResult<Self> {
        codec::load(bytes)
    }

    fn dump(&self, output: &mut [u8]) -> PageResult<()> {
        codec::dump(self, output)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::journal::{JournalError, SlotJournal};

    /// A journal that records every call, in order, for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingJournal {
        pub(crate) entries: Vec<JournalEntry>,
    }

    #[derive(Debug, PartialEq, Eq)]
    pub(crate) enum JournalEntry {
        Insert(RecordLocation, RecordSlot),
        Update(RecordLocation, RecordSlot, RecordSlot),
        Remove(RecordLocation, RecordSlot),
    }

    impl SlotJournal for RecordingJournal {
        fn journal_insert(
            &mut self,
            location: RecordLocation,
            slot: &RecordSlot,
        ) -> Result<(), JournalError> {
            self.entries
                .push(JournalEntry::Insert(location, slot.clone()));
            Ok(())
        }

        fn journal_update(
            &mut self,
            location: RecordLocation,
            before: &RecordSlot,
            after: &RecordSlot,
        ) -> Result<(), JournalError> {
            self.entries
                .push(JournalEntry::Update(location, before.clone(), after.clone()));
            Ok(())
        }

        fn journal_remove(
            &mut self,
            location: RecordLocation,
            slot: &RecordSlot,
        ) -> Result<(), JournalError> {
            self.entries
                .push(JournalEntry::Remove(location, slot.clone()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod record_page_tests {
    use super::test_support::RecordingJournal;
    use super::*;
    use crate::page::DEFAULT_PAGE_SIZE;

    #[test]
    fn empty_page_free_space() {
        let page = RecordPage::with_size(1, DEFAULT_PAGE_SIZE);
        // Fixed header plus one span entry reserved for the insert.
        assert_eq!(
            page.free_space_size(PageOperation::Insert),
            DEFAULT_PAGE_SIZE
                - RecordPageHeader::FIXED_STORAGE_SIZE
                - RecordPageHeader::SPAN_ENTRY_SIZE
        );
        assert_eq!(
            page.free_space_size(PageOperation::Update),
            DEFAULT_PAGE_SIZE - RecordPageHeader::FIXED_STORAGE_SIZE
        );
    }

    #[test]
    fn linked_page_ids_default_to_null() {
        let mut page = RecordPage::with_size(1, DEFAULT_PAGE_SIZE);
        assert_eq!(page.next_page_id(), 0);
        assert_eq!(page.prev_page_id(), 0);
        page.set_next_page_id(8);
        page.set_prev_page_id(4);
        assert_eq!(page.next_page_id(), 8);
        assert_eq!(page.prev_page_id(), 4);
    }

    #[test]
    fn free_space_shrinks_by_slot_and_span_entry() {
        let mut page = RecordPage::with_size(1, DEFAULT_PAGE_SIZE);
        let mut journal = RecordingJournal::default();
        let before = page.free_space_size(PageOperation::Insert);

        let slot = RecordSlot::new(vec![7u8; 100]);
        let size = slot.storage_size();
        page.insert_slot(slot, &mut journal).unwrap();

        let after = page.free_space_size(PageOperation::Insert);
        assert_eq!(
            before - after,
            size + RecordPageHeader::SPAN_ENTRY_SIZE
        );
    }

    #[test]
    fn full_page_reports_zero_insert_space() {
        let mut page = RecordPage::with_size(1, 512);
        let mut journal = RecordingJournal::default();
        let capacity = page.free_space_size(PageOperation::Insert) - RecordSlot::FIXED_STORAGE_SIZE;
        page.insert_slot(RecordSlot::new(vec![1u8; capacity]), &mut journal)
            .unwrap();
        assert_eq!(page.free_space_size(PageOperation::Insert), 0);
    }
}
