//! The record manager.

use crate::RecordError;
use buffer::BufferError;
use buffer::handle::PageHandle;
use buffer::manager::BufferManager;
use file::errors::StorageError;
use page::errors::page_error::PageError;
use page::location::RecordLocation;
use page::page::Page;
use page::page::PageOperation;
use page::record_page::RecordPage;
use page::record_slot::RecordSlot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use txn::transaction::Transaction;

/// Stores byte records as doubly-linked chains of slot fragments.
///
/// Fragments are written left to right: each one goes to a page picked by
/// the free space manager, takes as much of the remaining payload as the
/// page can hold, and is linked to its neighbors through the slot
/// locations in its header. Every sub-mutation runs under the caller's
/// transaction and is journaled before it is applied.
#[derive(Debug)]
pub struct RecordManager {
    buffer: Arc<BufferManager<RecordPage>>,
    started: AtomicBool,
}

impl RecordManager {
    pub fn new(buffer: Arc<BufferManager<RecordPage>>) -> Self {
        Self {
            buffer,
            started: AtomicBool::new(false),
        }
    }

    /// Starts the manager over an already started buffer.
    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
    }

    fn ensure_started(&self) -> Result<(), RecordError> {
        if self.started.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(RecordError::NotStarted)
        }
    }

    /// Inserts `data` as a new record and returns the location of its
    /// first fragment.
    pub fn insert(
        &self,
        txn: &mut Transaction,
        data: &[u8],
    ) -> Result<RecordLocation, RecordError> {
        self.ensure_started()?;
        let location = self.insert_chain(txn, data, RecordLocation::NULL)?;
        tracing::debug!(
            transaction_id = txn.id(),
            %location,
            bytes = data.len(),
            "record inserted"
        );
        Ok(location)
    }

    /// Reads the record at `location` by concatenating its fragment
    /// chain.
    pub fn read(
        &self,
        txn: &Transaction,
        location: RecordLocation,
    ) -> Result<Vec<u8>, RecordError> {
        self.ensure_started()?;
        if location.is_null() {
            return Err(RecordError::NotFound(location));
        }

        let mut data = Vec::new();
        let mut read_location = location;
        while !read_location.is_null() {
            let handle = self.page_of(read_location, location)?;
            let page = handle.read();
            let slot = Self::slot_of(&page, read_location, location)?;
            data.extend_from_slice(&slot.data);
            read_location = slot.next_location;
        }
        tracing::trace!(
            transaction_id = txn.id(),
            %location,
            bytes = data.len(),
            "record read"
        );
        Ok(data)
    }

    /// Rewrites the record at `location` with `data`. Existing fragments
    /// are rewritten in place; leftover payload grows the chain, leftover
    /// fragments are cut off and removed.
    pub fn update(
        &self,
        txn: &mut Transaction,
        location: RecordLocation,
        data: &[u8],
    ) -> Result<(), RecordError> {
        self.ensure_started()?;
        if location.is_null() {
            return Err(RecordError::NotFound(location));
        }

        let mut written = 0usize;
        let mut current = location;
        let mut last_kept = RecordLocation::NULL;
        let mut first_pass = true;

        // In-place pass: refill each existing fragment with as much of
        // the new payload as its page can hold.
        while !current.is_null() && (first_pass || written < data.len()) {
            first_pass = false;
            let handle = self.page_of(current, location)?;
            let mut page = handle.write();
            let existing = Self::slot_of(&page, current, location)?.clone();

            let write_space =
                existing.data.len() + page.free_space_size(PageOperation::Update);
            let take = write_space.min(data.len() - written);

            let mut replacement = RecordSlot::new(data[written..written + take].to_vec());
            replacement.prev_location = existing.prev_location;
            replacement.next_location = existing.next_location;
            page.update_slot(current.slot_id, replacement, txn)?;

            last_kept = current;
            current = existing.next_location;
            written += take;
        }

        if written < data.len() {
            // The old chain ran out of room: append the remainder.
            let appended = self.insert_chain(txn, &data[written..], last_kept)?;
            let handle = self.page_of(last_kept, location)?;
            handle
                .write()
                .set_slot_next_location(last_kept.slot_id, appended)?;
        } else if !current.is_null() {
            // The new payload is shorter: cut the chain and drop the
            // leftover fragments.
            let handle = self.page_of(last_kept, location)?;
            handle
                .write()
                .set_slot_next_location(last_kept.slot_id, RecordLocation::NULL)?;
            drop(handle);
            self.remove_chain(txn, current)?;
        }
        tracing::debug!(
            transaction_id = txn.id(),
            %location,
            bytes = data.len(),
            "record updated"
        );
        Ok(())
    }

    /// Removes the record at `location`, fragment by fragment.
    pub fn remove(
        &self,
        txn: &mut Transaction,
        location: RecordLocation,
    ) -> Result<(), RecordError> {
        self.ensure_started()?;
        if location.is_null() {
            return Err(RecordError::NotFound(location));
        }
        self.remove_chain(txn, location)?;
        tracing::debug!(transaction_id = txn.id(), %location, "record removed");
        Ok(())
    }

    /// Writes `data` as a fresh fragment chain. The first new fragment's
    /// prev link points at `prev_tail` (null for a standalone record);
    /// the caller is responsible for patching `prev_tail`'s next link.
    /// Zero-length payloads still produce one empty fragment so the
    /// record has an addressable location.
    fn insert_chain(
        &self,
        txn: &mut Transaction,
        data: &[u8],
        prev_tail: RecordLocation,
    ) -> Result<RecordLocation, RecordError> {
        let mut first = RecordLocation::NULL;
        let mut prev = prev_tail;
        let mut written = 0usize;
        let mut force_new_page = false;

        loop {
            let handle = if force_new_page {
                self.buffer.get_new()?
            } else {
                self.buffer.get_free()?
            };
            let page_id = handle.page_id();

            // Size the fragment under the page's write latch: between the
            // free space pick and this point a concurrent transaction may
            // have consumed the page.
            let inserted = {
                let mut page = handle.write();
                let write_space = page
                    .free_space_size(PageOperation::Insert)
                    .saturating_sub(RecordSlot::FIXED_STORAGE_SIZE);
                if write_space == 0 {
                    None
                } else {
                    let take = write_space.min(data.len() - written);
                    let mut slot = RecordSlot::new(data[written..written + take].to_vec());
                    slot.prev_location = prev;
                    let slot_id = page.insert_slot(slot, txn)?;
                    Some((slot_id, take))
                }
            };
            drop(handle);

            let Some((slot_id, take)) = inserted else {
                // The picked page could not even cover the slot overhead;
                // retry on a fresh page.
                force_new_page = true;
                continue;
            };
            force_new_page = false;

            let this = RecordLocation::new(page_id, slot_id);
            if first.is_null() {
                first = this;
            } else {
                // Link the previously written fragment forward.
                let prev_handle = self.buffer.get(prev.page_id)?;
                prev_handle
                    .write()
                    .set_slot_next_location(prev.slot_id, this)?;
            }
            prev = this;
            written += take;
            if written >= data.len() {
                break;
            }
        }
        Ok(first)
    }

    /// Removes every fragment reachable from `location`.
    fn remove_chain(
        &self,
        txn: &mut Transaction,
        location: RecordLocation,
    ) -> Result<(), RecordError> {
        let mut remove_location = location;
        while !remove_location.is_null() {
            let handle = self.page_of(remove_location, location)?;
            let mut page = handle.write();
            let next = Self::slot_of(&page, remove_location, location)?.next_location;
            page.remove_slot(remove_location.slot_id, txn)?;
            remove_location = next;
        }
        Ok(())
    }

    /// Resolves the page of a chain hop, translating a missing page into
    /// `NotFound` on the first hop and `Corrupt` afterwards: a broken
    /// link further down means the chain itself is structurally invalid.
    fn page_of(
        &self,
        hop: RecordLocation,
        origin: RecordLocation,
    ) -> Result<PageHandle<'_, RecordPage>, RecordError> {
        match self.buffer.get(hop.page_id) {
            Ok(handle) => Ok(handle),
            Err(BufferError::Storage(StorageError::PageNotFound(_))) => {
                Err(Self::chain_break(hop, origin))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Resolves the slot of a chain hop with the same translation rule.
    fn slot_of<'p>(
        page: &'p RecordPage,
        hop: RecordLocation,
        origin: RecordLocation,
    ) -> Result<&'p RecordSlot, RecordError> {
        match page.slot(hop.slot_id) {
            Ok(slot) => Ok(slot),
            Err(PageError::SlotNotFound { .. }) => Err(Self::chain_break(hop, origin)),
            Err(error) => Err(error.into()),
        }
    }

    fn chain_break(hop: RecordLocation, origin: RecordLocation) -> RecordError {
        if hop == origin {
            RecordError::NotFound(origin)
        } else {
            RecordError::Corrupt(origin)
        }
    }
}

#[cfg(test)]
mod record_manager_tests {
    use super::*;
    use file::factory::{StorageTarget, open_storage};
    use page::log_page::LogPage;
    use txn::manager::TransactionManager;
    use wal::manager::LogManager;

    struct Fixture {
        buffer: Arc<BufferManager<RecordPage>>,
        txn_manager: TransactionManager,
        records: RecordManager,
    }

    fn fixture(page_size: usize) -> Fixture {
        let data = open_storage::<RecordPage>(&StorageTarget::Memory, page_size).unwrap();
        let log = open_storage::<LogPage>(&StorageTarget::Memory, page_size).unwrap();
        let buffer = Arc::new(BufferManager::new(data, 8).unwrap());
        buffer.start().unwrap();
        let log_manager = Arc::new(LogManager::new(log, 8).unwrap());
        log_manager.start().unwrap();
        let txn_manager = TransactionManager::new(Arc::clone(&buffer), log_manager);
        let records = RecordManager::new(Arc::clone(&buffer));
        records.start();
        Fixture {
            buffer,
            txn_manager,
            records,
        }
    }

    #[test]
    fn operations_fail_before_start() {
        let fixture = fixture(512);
        fixture.records.stop();
        let mut txn = fixture.txn_manager.begin().unwrap();
        assert!(matches!(
            fixture.records.insert(&mut txn, b"x"),
            Err(RecordError::NotStarted)
        ));
    }

    #[test]
    fn small_record_round_trips() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let location = fixture.records.insert(&mut txn, b"testing").unwrap();
        assert_eq!(location, RecordLocation::new(1, 1));
        let read = fixture.records.read(&txn, location).unwrap();
        assert_eq!(read, b"testing");
    }

    #[test]
    fn empty_record_gets_an_addressable_location() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let location = fixture.records.insert(&mut txn, b"").unwrap();
        assert!(!location.is_null());
        assert_eq!(fixture.records.read(&txn, location).unwrap(), b"");
    }

    #[test]
    fn large_record_spans_pages_with_sound_links() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let payload = vec![b'A'; 2 * 512 + 100];
        let location = fixture.records.insert(&mut txn, &payload).unwrap();

        assert_eq!(fixture.records.read(&txn, location).unwrap(), payload);
        assert!(fixture.buffer.page_count() >= 3);

        // First fragment's prev and last fragment's next are null.
        let first_handle = fixture.buffer.get(location.page_id).unwrap();
        let first_page = first_handle.read();
        let first = first_page.slot(location.slot_id).unwrap();
        assert!(first.prev_location.is_null());
        let mut tail = first.clone();
        drop(first_page);
        drop(first_handle);
        while !tail.next_location.is_null() {
            let handle = fixture.buffer.get(tail.next_location.page_id).unwrap();
            let page = handle.read();
            tail = page.slot(tail.next_location.slot_id).unwrap().clone();
        }
        assert!(tail.next_location.is_null());
    }

    #[test]
    fn read_of_null_location_is_not_found() {
        let fixture = fixture(512);
        let txn = fixture.txn_manager.begin().unwrap();
        assert!(matches!(
            fixture.records.read(&txn, RecordLocation::NULL),
            Err(RecordError::NotFound(_))
        ));
    }

    #[test]
    fn removed_record_reads_as_not_found() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let location = fixture.records.insert(&mut txn, b"short lived").unwrap();
        fixture.records.remove(&mut txn, location).unwrap();
        assert!(matches!(
            fixture.records.read(&txn, location),
            Err(RecordError::NotFound(_))
        ));
    }

    #[test]
    fn broken_later_hop_reads_as_corrupt() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let payload = vec![b'B'; 600];
        let location = fixture.records.insert(&mut txn, &payload).unwrap();

        // Find the second fragment and rip it out behind the manager's
        // back.
        let second = {
            let handle = fixture.buffer.get(location.page_id).unwrap();
            let page = handle.read();
            page.slot(location.slot_id).unwrap().next_location
        };
        {
            let handle = fixture.buffer.get(second.page_id).unwrap();
            let mut page = handle.write();
            page.remove_slot(second.slot_id, &mut txn).unwrap();
        }

        assert!(matches!(
            fixture.records.read(&txn, location),
            Err(RecordError::Corrupt(_))
        ));
    }

    #[test]
    fn update_in_place_round_trips() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let location = fixture.records.insert(&mut txn, b"testing").unwrap();
        fixture
            .records
            .update(&mut txn, location, b"replacement")
            .unwrap();
        assert_eq!(fixture.records.read(&txn, location).unwrap(), b"replacement");
    }

    #[test]
    fn update_grows_across_pages() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let location = fixture.records.insert(&mut txn, b"seed").unwrap();
        let payload = vec![b'C'; 900];
        fixture.records.update(&mut txn, location, &payload).unwrap();
        assert_eq!(fixture.records.read(&txn, location).unwrap(), payload);
    }

    #[test]
    fn update_shrinks_and_frees_the_tail() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let payload = vec![b'D'; 900];
        let location = fixture.records.insert(&mut txn, &payload).unwrap();
        fixture.records.update(&mut txn, location, b"tiny").unwrap();
        assert_eq!(fixture.records.read(&txn, location).unwrap(), b"tiny");

        // The first fragment no longer links anywhere.
        let handle = fixture.buffer.get(location.page_id).unwrap();
        let page = handle.read();
        assert!(page.slot(location.slot_id).unwrap().next_location.is_null());
    }

    #[test]
    fn update_to_empty_keeps_the_location_live() {
        let fixture = fixture(512);
        let mut txn = fixture.txn_manager.begin().unwrap();
        let location = fixture.records.insert(&mut txn, b"something").unwrap();
        fixture.records.update(&mut txn, location, b"").unwrap();
        assert_eq!(fixture.records.read(&txn, location).unwrap(), b"");
    }
}
