//! Identifier and location types shared across the engine.
//!
//! A value of `0` never names a real page, slot, sequence number or
//! transaction. Locations pair a page id with an in-page key and act as the
//! abstract address of a slot in backend storage.

use binary_helpers::bin_error::BinaryError;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use std::fmt;

/// Identifier of a page within one storage backend. `0` is the null id.
pub type PageId = u64;

/// Identifier of a slot within one record page. `0` is the null id.
pub type SlotId = u64;

/// Sequence number of a log record. Strictly increasing, `0` is null.
pub type SeqNumber = u64;

/// Identifier of a transaction, unique within the process lifetime.
pub type TransactionId = u64;

/// Address of a record slot: the `(PageId, SlotId)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RecordLocation {
    /// Page containing the slot.
    pub page_id: PageId,
    /// Slot within the page.
    pub slot_id: SlotId,
}

impl RecordLocation {
    /// The null location.
    pub const NULL: RecordLocation = RecordLocation {
        page_id: 0,
        slot_id: 0,
    };

    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }

    /// A location with page id `0` does not address anything.
    pub fn is_null(&self) -> bool {
        self.page_id == 0
    }

    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, BinaryError> {
        Ok(Self {
            page_id: reader.read::<u64>()?,
            slot_id: reader.read::<u64>()?,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter<'_>) -> Result<(), BinaryError> {
        writer.write::<u64>(self.page_id)?;
        writer.write::<u64>(self.slot_id)
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.page_id, self.slot_id)
    }
}

/// Address of a log slot: the `(PageId, SeqNumber)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LogLocation {
    /// Log page containing the slot.
    pub page_id: PageId,
    /// Sequence number of the log record stored in the slot.
    pub seq_number: SeqNumber,
}

impl LogLocation {
    /// The null location.
    pub const NULL: LogLocation = LogLocation {
        page_id: 0,
        seq_number: 0,
    };

    pub fn new(page_id: PageId, seq_number: SeqNumber) -> Self {
        Self {
            page_id,
            seq_number,
        }
    }

    /// A null log location has both components zero.
    pub fn is_null(&self) -> bool {
        self.page_id == 0 && self.seq_number == 0
    }

    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, BinaryError> {
        Ok(Self {
            page_id: reader.read::<u64>()?,
            seq_number: reader.read::<u64>()?,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter<'_>) -> Result<(), BinaryError> {
        writer.write::<u64>(self.page_id)?;
        writer.write::<u64>(self.seq_number)
    }
}

impl fmt::Display for LogLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.page_id, self.seq_number)
    }
}

#[cfg(test)]
mod location_tests {
    use super::*;

    #[test]
    fn default_record_location_is_null() {
        assert!(RecordLocation::default().is_null());
        assert!(RecordLocation::NULL.is_null());
    }

    #[test]
    fn record_location_with_page_is_not_null() {
        assert!(!RecordLocation::new(1, 0).is_null());
    }

    #[test]
    fn log_location_null_requires_both_components_zero() {
        assert!(LogLocation::NULL.is_null());
        assert!(!LogLocation::new(1, 0).is_null());
        assert!(!LogLocation::new(0, 1).is_null());
    }

    #[test]
    fn locations_round_trip_through_cursors() {
        let mut bytes = vec![0u8; 32];
        let location = RecordLocation::new(7, 3);
        let log_location = LogLocation::new(2, 91);
        {
            let mut writer = ByteWriter::new(&mut bytes);
            location.write_to(&mut writer).unwrap();
            log_location.write_to(&mut writer).unwrap();
        }
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(RecordLocation::read_from(&mut reader).unwrap(), location);
        assert_eq!(LogLocation::read_from(&mut reader).unwrap(), log_location);
    }

    #[test]
    fn display_shows_both_components() {
        assert_eq!(RecordLocation::new(3, 9).to_string(), "[3, 9]");
        assert_eq!(LogLocation::new(4, 17).to_string(), "[4, 17]");
    }
}
