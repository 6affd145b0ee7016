//! Slot level operations of the record page.
//!
//! The mutation order is fixed: the journal entry is written first, the
//! in-memory page second. Once the journal call returns, the mutation
//! itself cannot fail, so a journaled operation is never half applied.

use crate::errors::page_error::{PageError, PageResult};
use crate::journal::SlotJournal;
use crate::location::{RecordLocation, SlotId};
use crate::record_page::RecordPage;
use crate::record_slot::RecordSlot;

impl RecordPage {
    /// Returns the slot stored under `slot_id`.
    pub fn slot(&self, slot_id: SlotId) -> PageResult<&RecordSlot> {
        self.slots.get(&slot_id).ok_or(PageError::SlotNotFound {
            page_id: self.header.page_id,
            slot_id,
        })
    }

    /// Inserts `slot` into the next free slot id and returns that id.
    pub fn insert_slot(
        &mut self,
        slot: RecordSlot,
        journal: &mut dyn SlotJournal,
    ) -> PageResult<SlotId> {
        let slot_id = self.header.next_slot_id();
        journal.journal_insert(self.location_of(slot_id), &slot)?;

        self.header.push_slot(slot_id, slot.storage_size());
        self.slots.insert(slot_id, slot);
        Ok(slot_id)
    }

    /// Replaces the slot under `slot_id` with `slot`, adjusting the spans
    /// of every higher slot by the size delta.
    pub fn update_slot(
        &mut self,
        slot_id: SlotId,
        slot: RecordSlot,
        journal: &mut dyn SlotJournal,
    ) -> PageResult<()> {
        let before = self.slot(slot_id)?;
        journal.journal_update(self.location_of(slot_id), before, &slot)?;

        self.header.update_slot(slot_id, slot.storage_size());
        self.slots.insert(slot_id, slot);
        Ok(())
    }

    /// Removes the slot under `slot_id`, closing the gap it occupied.
    pub fn remove_slot(&mut self, slot_id: SlotId, journal: &mut dyn SlotJournal) -> PageResult<()> {
        let slot = self.slot(slot_id)?;
        journal.journal_remove(self.location_of(slot_id), slot)?;

        self.header.free_slot(slot_id);
        self.slots.remove(&slot_id);
        Ok(())
    }

    /// Re-inserts `slot` at the specific `slot_id` it previously occupied.
    /// Used by rollback to invert a remove; journaled as an insert so the
    /// undo itself is recoverable.
    pub fn undo_remove_slot(
        &mut self,
        slot_id: SlotId,
        slot: RecordSlot,
        journal: &mut dyn SlotJournal,
    ) -> PageResult<()> {
        journal.journal_insert(self.location_of(slot_id), &slot)?;

        self.header.create_slot_at(slot_id, slot.storage_size());
        self.slots.insert(slot_id, slot);
        Ok(())
    }

    /// Patches the next-location link of an existing slot. Link patches are
    /// not journaled; rollback removes the whole slot, links included.
    pub fn set_slot_next_location(
        &mut self,
        slot_id: SlotId,
        location: RecordLocation,
    ) -> PageResult<()> {
        let page_id = self.header.page_id;
        let slot = self
            .slots
            .get_mut(&slot_id)
            .ok_or(PageError::SlotNotFound { page_id, slot_id })?;
        slot.next_location = location;
        Ok(())
    }

    /// Patches the prev-location link of an existing slot.
    pub fn set_slot_prev_location(
        &mut self,
        slot_id: SlotId,
        location: RecordLocation,
    ) -> PageResult<()> {
        let page_id = self.header.page_id;
        let slot = self
            .slots
            .get_mut(&slot_id)
            .ok_or(PageError::SlotNotFound { page_id, slot_id })?;
        slot.prev_location = location;
        Ok(())
    }
}

#[cfg(test)]
mod ops_tests {
    use super::*;
    use crate::page::{DEFAULT_PAGE_SIZE, Page};
    use crate::record_page::test_support::{JournalEntry, RecordingJournal};

    fn page() -> RecordPage {
        RecordPage::with_size(1, DEFAULT_PAGE_SIZE)
    }

    #[test]
    fn missing_slot_is_not_found() {
        let page = page();
        assert!(matches!(
            page.slot(1),
            Err(PageError::SlotNotFound {
                page_id: 1,
                slot_id: 1
            })
        ));
    }

    #[test]
    fn insert_assigns_sequential_ids_and_journals_first() {
        let mut page = page();
        let mut journal = RecordingJournal::default();

        let first = page
            .insert_slot(RecordSlot::new(b"one".to_vec()), &mut journal)
            .unwrap();
        let second = page
            .insert_slot(RecordSlot::new(b"two".to_vec()), &mut journal)
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(page.slot(1).unwrap().data, b"one");
        assert_eq!(page.slot(2).unwrap().data, b"two");
        assert_eq!(
            journal.entries[0],
            JournalEntry::Insert(RecordLocation::new(1, 1), RecordSlot::new(b"one".to_vec()))
        );
    }

    #[test]
    fn update_journals_before_and_after_images() {
        let mut page = page();
        let mut journal = RecordingJournal::default();
        page.insert_slot(RecordSlot::new(b"before".to_vec()), &mut journal)
            .unwrap();

        page.update_slot(1, RecordSlot::new(b"after!!".to_vec()), &mut journal)
            .unwrap();

        assert_eq!(page.slot(1).unwrap().data, b"after!!");
        assert_eq!(
            journal.entries[1],
            JournalEntry::Update(
                RecordLocation::new(1, 1),
                RecordSlot::new(b"before".to_vec()),
                RecordSlot::new(b"after!!".to_vec())
            )
        );
    }

    #[test]
    fn update_of_missing_slot_fails_without_journaling() {
        let mut page = page();
        let mut journal = RecordingJournal::default();
        let result = page.update_slot(9, RecordSlot::new(vec![1]), &mut journal);
        assert!(matches!(result, Err(PageError::SlotNotFound { .. })));
        assert!(journal.entries.is_empty());
    }

    #[test]
    fn remove_then_undo_restores_the_page() {
        let mut page = page();
        let mut journal = RecordingJournal::default();
        page.insert_slot(RecordSlot::new(b"first".to_vec()), &mut journal)
            .unwrap();
        page.insert_slot(RecordSlot::new(b"second".to_vec()), &mut journal)
            .unwrap();
        page.insert_slot(RecordSlot::new(b"third".to_vec()), &mut journal)
            .unwrap();
        let spans_before = page.header.spans.clone();
        let removed = page.slot(2).unwrap().clone();

        page.remove_slot(2, &mut journal).unwrap();
        assert!(page.slot(2).is_err());

        page.undo_remove_slot(2, removed.clone(), &mut journal)
            .unwrap();
        assert_eq!(page.slot(2).unwrap(), &removed);
        assert_eq!(page.header.spans, spans_before);
        // The undo was journaled as an insert at the original location.
        assert_eq!(
            journal.entries.last().unwrap(),
            &JournalEntry::Insert(RecordLocation::new(1, 2), removed)
        );
    }

    #[test]
    fn link_patches_reach_the_stored_slot() {
        let mut page = page();
        let mut journal = RecordingJournal::default();
        page.insert_slot(RecordSlot::new(b"chained".to_vec()), &mut journal)
            .unwrap();

        page.set_slot_next_location(1, RecordLocation::new(5, 1))
            .unwrap();
        page.set_slot_prev_location(1, RecordLocation::new(4, 2))
            .unwrap();

        let slot = page.slot(1).unwrap();
        assert_eq!(slot.next_location, RecordLocation::new(5, 1));
        assert_eq!(slot.prev_location, RecordLocation::new(4, 2));
        assert!(page.set_slot_next_location(3, RecordLocation::NULL).is_err());
    }
}
