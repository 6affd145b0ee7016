//! The write-ahead log page.
//!
//! Unlike the record page, slots here are keyed by the sequence number of
//! the log record they hold and are laid out sequentially after the
//! header. The header remembers the highest sequence number present so
//! the log manager can seed its counter from the tail page on startup.

use crate::errors::page_error::{PageError, PageResult};
use crate::errors::parse_error::{PageCorruptError, PageParseError};
use crate::location::{LogLocation, PageId, SeqNumber};
use crate::log_slot::LogSlot;
use crate::page::{Page, PageOperation};
use binary_helpers::checksum::checksum;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use std::collections::BTreeMap;

/// Log page header: identity plus the highest stored sequence number.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LogPageHeader {
    pub(crate) page_id: PageId,
    pub(crate) last_seq_number: SeqNumber,
    pub(crate) page_size: usize,
}

impl LogPageHeader {
    /// page_id + last_seq_number + slot_count + checksum.
    pub(crate) const STORAGE_SIZE: usize = 3 * 8 + 4;
}

/// A page of log record fragments keyed by sequence number.
#[derive(Debug, PartialEq, Eq)]
pub struct LogPage {
    pub(crate) header: LogPageHeader,
    /// Slots ordered by sequence number for a deterministic layout.
    pub(crate) slots: BTreeMap<SeqNumber, LogSlot>,
    /// Bytes occupied by the header and all stored slots.
    pub(crate) data_size: usize,
}

impl LogPage {
    /// Highest sequence number stored on this page, `0` when empty.
    pub fn last_seq_number(&self) -> SeqNumber {
        self.header.last_seq_number
    }

    /// Returns the fragment stored for `seq_number`.
    pub fn slot(&self, seq_number: SeqNumber) -> PageResult<&LogSlot> {
        self.slots
            .get(&seq_number)
            .ok_or(PageError::LogSlotNotFound {
                page_id: self.header.page_id,
                seq_number,
            })
    }

    /// Inserts a fragment. The caller sizes the payload against
    /// `free_space_size`, so insertion itself cannot fail.
    pub fn insert_slot(&mut self, slot: LogSlot) {
        self.data_size += slot.storage_size();
        if slot.seq_number > self.header.last_seq_number {
            self.header.last_seq_number = slot.seq_number;
        }
        self.slots.insert(slot.seq_number, slot);
    }

    /// Patches the continuation link of the fragment for `seq_number`.
    pub fn set_slot_next_location(
        &mut self,
        seq_number: SeqNumber,
        location: LogLocation,
    ) -> PageResult<()> {
        let page_id = self.header.page_id;
        let slot = self
            .slots
            .get_mut(&seq_number)
            .ok_or(PageError::LogSlotNotFound {
                page_id,
                seq_number,
            })?;
        slot.next_location = location;
        Ok(())
    }
}

impl Page for LogPage {
    fn with_size(page_id: PageId, page_size: usize) -> Self {
        Self {
            header: LogPageHeader {
                page_id,
                last_seq_number: 0,
                page_size,
            },
            slots: BTreeMap::new(),
            data_size: LogPageHeader::STORAGE_SIZE,
        }
    }

    fn id(&self) -> PageId {
        self.header.page_id
    }

    /// Free payload bytes, with the fixed slot header already subtracted
    /// so callers can size a fragment before paying for its header.
    fn free_space_size(&self, _operation: PageOperation) -> usize {
        self.header
            .page_size
            .saturating_sub(self.data_size + LogSlot::FIXED_STORAGE_SIZE)
    }

    fn storage_size(&self) -> usize {
        self.header.page_size
    }

    fn load(bytes: &[u8]) -> PageResult<Self> {
        let page_size = bytes.len();
        let mut reader = ByteReader::new(bytes);

        let page_id = reader.read::<u64>().map_err(PageParseError::Binary)?;
        let last_seq_number = reader.read::<u64>().map_err(PageParseError::Binary)?;
        let slot_count = reader.read::<u64>().map_err(PageParseError::Binary)?;
        let covered = reader.consumed();
        let stored = reader.read::<u32>().map_err(PageParseError::Binary)?;
        PageCorruptError::verify(covered, stored)?;

        let mut slots = BTreeMap::new();
        let mut data_size = LogPageHeader::STORAGE_SIZE;
        for _ in 0..slot_count {
            let slot = LogSlot::load_from(&mut reader)?;
            data_size += slot.storage_size();
            slots.insert(slot.seq_number, slot);
        }

        Ok(Self {
            header: LogPageHeader {
                page_id,
                last_seq_number,
                page_size,
            },
            slots,
            data_size,
        })
    }

    fn dump(&self, output: &mut [u8]) -> PageResult<()> {
        if output.len() != self.header.page_size {
            return Err(PageParseError::Truncated {
                needed: self.header.page_size,
                available: output.len(),
            }
            .into());
        }

        let mut writer = ByteWriter::new(output);
        writer
            .write::<u64>(self.header.page_id)
            .map_err(PageParseError::Binary)?;
        writer
            .write::<u64>(self.header.last_seq_number)
            .map_err(PageParseError::Binary)?;
        writer
            .write::<u64>(self.slots.len() as u64)
            .map_err(PageParseError::Binary)?;
        let crc = checksum(writer.written());
        writer.write::<u32>(crc).map_err(PageParseError::Binary)?;

        for slot in self.slots.values() {
            slot.dump_into(&mut writer)?;
        }
        let remaining = self.header.page_size - writer.position();
        writer
            .fill_zero(remaining)
            .map_err(PageParseError::Binary)?;
        Ok(())
    }
}

#[cfg(test)]
mod log_page_tests {
    use super::*;
    use crate::page::DEFAULT_LOG_PAGE_SIZE;

    fn fragment(seq: SeqNumber, payload: &[u8]) -> LogSlot {
        let mut slot = LogSlot::new(seq);
        slot.data = payload.to_vec();
        slot
    }

    #[test]
    fn empty_page_has_no_last_seq_number() {
        let page = LogPage::with_size(1, DEFAULT_LOG_PAGE_SIZE);
        assert_eq!(page.last_seq_number(), 0);
        assert_eq!(
            page.free_space_size(PageOperation::Insert),
            DEFAULT_LOG_PAGE_SIZE - LogPageHeader::STORAGE_SIZE - LogSlot::FIXED_STORAGE_SIZE
        );
    }

    #[test]
    fn insert_tracks_last_seq_number_and_data_size() {
        let mut page = LogPage::with_size(1, DEFAULT_LOG_PAGE_SIZE);
        let before = page.free_space_size(PageOperation::Insert);
        page.insert_slot(fragment(5, b"five"));
        page.insert_slot(fragment(3, b"three"));

        assert_eq!(page.last_seq_number(), 5);
        assert_eq!(page.slot(3).unwrap().data, b"three");
        let spent = (LogSlot::FIXED_STORAGE_SIZE + 4) + (LogSlot::FIXED_STORAGE_SIZE + 5);
        assert_eq!(before - page.free_space_size(PageOperation::Insert), spent);
    }

    #[test]
    fn missing_fragment_is_not_found() {
        let page = LogPage::with_size(1, DEFAULT_LOG_PAGE_SIZE);
        assert!(matches!(
            page.slot(9),
            Err(PageError::LogSlotNotFound {
                page_id: 1,
                seq_number: 9
            })
        ));
    }

    #[test]
    fn page_round_trips() {
        let mut page = LogPage::with_size(7, DEFAULT_LOG_PAGE_SIZE);
        page.insert_slot(fragment(1, b"first"));
        let mut continued = fragment(2, b"second");
        continued.next_location = LogLocation::new(8, 2);
        page.insert_slot(continued);

        let mut bytes = vec![0u8; DEFAULT_LOG_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        let loaded = LogPage::load(&bytes).unwrap();
        assert_eq!(loaded, page);
    }

    #[test]
    fn next_location_patch_round_trips() {
        let mut page = LogPage::with_size(7, DEFAULT_LOG_PAGE_SIZE);
        page.insert_slot(fragment(4, b"head"));
        page.set_slot_next_location(4, LogLocation::new(9, 4)).unwrap();

        let mut bytes = vec![0u8; DEFAULT_LOG_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        let loaded = LogPage::load(&bytes).unwrap();
        assert_eq!(loaded.slot(4).unwrap().next_location, LogLocation::new(9, 4));
    }

    #[test]
    fn corrupted_header_is_rejected() {
        let page = LogPage::with_size(7, DEFAULT_LOG_PAGE_SIZE);
        let mut bytes = vec![0u8; DEFAULT_LOG_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        bytes[8] ^= 0x01;
        assert!(matches!(LogPage::load(&bytes), Err(PageError::Corrupt(_))));
    }
}
