//! The log manager.

use crate::errors::WalError;
use crate::log_record::LogRecord;
use buffer::manager::BufferManager;
use file::api::Storage;
use page::location::{LogLocation, PageId, SeqNumber};
use page::log_page::LogPage;
use page::log_slot::LogSlot;
use page::page::{Page, PageOperation};
use std::sync::{Mutex, MutexGuard};

/// Appends and reads log records over a dedicated buffer of log pages.
///
/// One manager-wide lock serializes `add`, `get` and `flush`. The lock
/// protects the sequence counter, the log buffer and the back-patching of
/// a previous fragment's continuation link, so sequence assignment is
/// atomic and multi-fragment writes never interleave.
#[derive(Debug)]
pub struct LogManager {
    inner: Mutex<LogManagerInner>,
}

#[derive(Debug)]
struct LogManagerInner {
    /// Sequence number of the latest appended record.
    seq_number: SeqNumber,
    buffer: BufferManager<LogPage>,
    started: bool,
}

impl LogManager {
    /// Creates a log manager over the given log storage.
    pub fn new(
        storage: Box<dyn Storage<LogPage> + Send>,
        capacity: usize,
    ) -> Result<Self, WalError> {
        Ok(Self {
            inner: Mutex::new(LogManagerInner {
                seq_number: 0,
                buffer: BufferManager::new(storage, capacity)?,
                started: false,
            }),
        })
    }

    /// Opens the log storage and seeds the sequence counter from the tail
    /// log page of an existing log.
    pub fn start(&self) -> Result<(), WalError> {
        let mut inner = self.lock();
        if inner.started {
            return Ok(());
        }
        inner.buffer.start()?;
        let last_page_id: PageId = inner.buffer.page_count();
        if last_page_id != 0 {
            let handle = inner.buffer.get(last_page_id)?;
            let last_seq = handle.read().last_seq_number();
            drop(handle);
            inner.seq_number = last_seq;
            tracing::debug!(seq_number = last_seq, "log manager resumed from tail page");
        }
        inner.started = true;
        Ok(())
    }

    /// Flushes the log and closes its storage.
    pub fn stop(&self) -> Result<(), WalError> {
        let mut inner = self.lock();
        if inner.started {
            inner.buffer.stop()?;
            inner.started = false;
        }
        Ok(())
    }

    /// Appends a record: assigns the next sequence number, serializes the
    /// record and writes it across as many log page slots as needed. Each
    /// fragment carries the record's sequence number; a fragment's
    /// continuation link points at the next one. Returns the location of
    /// the first fragment.
    pub fn add(&self, record: LogRecord) -> Result<LogLocation, WalError> {
        let mut inner = self.lock();
        inner.seq_number += 1;
        let seq_number = inner.seq_number;

        let mut record = record;
        record.set_seq_number(seq_number);
        let mut bytes = vec![0u8; record.storage_size()];
        record.dump(&mut bytes)?;

        let mut first_location = LogLocation::NULL;
        let mut prev_page_id: Option<PageId> = None;
        let mut written = 0usize;
        while written < bytes.len() {
            let handle = inner.buffer.get_free()?;
            let page_id = handle.page_id();

            let take = {
                let mut page = handle.write();
                // Free space already accounts for the fragment's slot
                // header, so every free page accepts at least one byte.
                let write_space = page.free_space_size(PageOperation::Insert);
                let take = write_space.min(bytes.len() - written);
                let mut slot = LogSlot::new(seq_number);
                slot.data = bytes[written..written + take].to_vec();
                page.insert_slot(slot);
                take
            };
            drop(handle);

            let location = LogLocation::new(page_id, seq_number);
            match prev_page_id {
                Some(prev) => {
                    // Patch the previous fragment to point here. Safe
                    // against concurrent appends because the whole of
                    // `add` runs under the manager lock.
                    let prev_handle = inner.buffer.get(prev)?;
                    prev_handle
                        .write()
                        .set_slot_next_location(seq_number, location)?;
                }
                None => first_location = location,
            }
            prev_page_id = Some(page_id);
            written += take;
        }

        tracing::debug!(
            seq_number,
            transaction_id = record.transaction_id(),
            "log record appended"
        );
        Ok(first_location)
    }

    /// Reads the record stored at `location`, concatenating its fragment
    /// chain before decoding.
    pub fn get(&self, location: LogLocation) -> Result<LogRecord, WalError> {
        let inner = self.lock();
        let mut bytes = Vec::new();
        let mut read_location = location;
        while !read_location.is_null() {
            let handle = inner.buffer.get(read_location.page_id)?;
            let page = handle.read();
            let slot = page.slot(read_location.seq_number)?;
            bytes.extend_from_slice(&slot.data);
            read_location = slot.next_location;
        }
        Ok(LogRecord::load(&bytes)?)
    }

    /// Flushes every buffered log page to storage.
    pub fn flush(&self) -> Result<(), WalError> {
        Ok(self.lock().buffer.flush_all()?)
    }

    /// The latest assigned sequence number.
    pub fn seq_number(&self) -> SeqNumber {
        self.lock().seq_number
    }

    fn lock(&self) -> MutexGuard<'_, LogManagerInner> {
        self.inner
            .lock()
            .expect("log manager poisoned: a thread panicked while holding the lock")
    }
}

#[cfg(test)]
mod log_manager_tests {
    use super::*;
    use crate::log_record::LogRecordKind;
    use file::factory::{StorageTarget, open_storage};
    use page::location::RecordLocation;
    use page::record_slot::RecordSlot;

    fn log_manager() -> LogManager {
        let storage = open_storage::<LogPage>(&StorageTarget::Memory, 512).unwrap();
        let manager = LogManager::new(storage, 4).unwrap();
        manager.start().unwrap();
        manager
    }

    #[test]
    fn add_assigns_increasing_seq_numbers() {
        let manager = log_manager();
        let first = manager.add(LogRecord::begin(1)).unwrap();
        let second = manager.add(LogRecord::begin(2)).unwrap();
        assert_eq!(first.seq_number, 1);
        assert_eq!(second.seq_number, 2);
        assert_eq!(manager.seq_number(), 2);
    }

    #[test]
    fn added_record_reads_back() {
        let manager = log_manager();
        let record = LogRecord::insert(
            9,
            LogLocation::NULL,
            RecordLocation::new(1, 1),
            RecordSlot::new(b"slot image".to_vec()),
        );
        let location = manager.add(record).unwrap();
        let loaded = manager.get(location).unwrap();
        assert_eq!(loaded.kind(), LogRecordKind::Insert);
        assert_eq!(loaded.seq_number(), 1);
        assert_eq!(loaded.transaction_id(), 9);
        assert_eq!(loaded.slot_a().data, b"slot image");
    }

    #[test]
    fn oversized_record_splits_across_pages() {
        let manager = log_manager();
        // A 512 byte log page holds ~448 payload bytes; this record's
        // image is far larger.
        let record = LogRecord::insert(
            1,
            LogLocation::NULL,
            RecordLocation::new(1, 1),
            RecordSlot::new(vec![0xAB; 1200]),
        );
        let expected = LogRecord::insert(
            1,
            LogLocation::NULL,
            RecordLocation::new(1, 1),
            RecordSlot::new(vec![0xAB; 1200]),
        );
        let location = manager.add(record).unwrap();
        let loaded = manager.get(location).unwrap();
        assert_eq!(loaded.slot_a(), expected.slot_a());
        // The split spanned several pages.
        let inner = manager.lock();
        assert!(inner.buffer.page_count() >= 3);
    }

    #[test]
    fn seq_counter_resumes_from_tail_page_after_restart() {
        let storage = open_storage::<LogPage>(&StorageTarget::Memory, 512).unwrap();
        let manager = LogManager::new(storage, 4).unwrap();
        manager.start().unwrap();
        manager.add(LogRecord::begin(1)).unwrap();
        manager.add(LogRecord::commit(1, LogLocation::NULL)).unwrap();
        manager.stop().unwrap();

        manager.start().unwrap();
        assert_eq!(manager.seq_number(), 2);
        let location = manager.add(LogRecord::begin(2)).unwrap();
        assert_eq!(location.seq_number, 3);
    }

    #[test]
    fn record_chain_via_prev_locations() {
        let manager = log_manager();
        let begin_location = manager.add(LogRecord::begin(5)).unwrap();
        let commit_location = manager.add(LogRecord::commit(5, begin_location)).unwrap();

        let commit = manager.get(commit_location).unwrap();
        assert_eq!(commit.kind(), LogRecordKind::Commit);
        let begin = manager.get(commit.prev_record_location()).unwrap();
        assert_eq!(begin.kind(), LogRecordKind::Begin);
        assert!(begin.prev_record_location().is_null());
    }
}
