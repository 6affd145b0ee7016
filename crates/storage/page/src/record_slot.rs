//! A single slot of a record page.
//!
//! A slot stores a full or partial data record. Records spanning multiple
//! slots form a doubly-linked list: each slot carries the locations of the
//! previous and next slots in the chain, with null locations terminating
//! it on both ends.

use crate::errors::page_error::PageResult;
use crate::errors::parse_error::{PageCorruptError, PageSlotParseError};
use crate::location::RecordLocation;
use binary_helpers::checksum::checksum;
use binary_helpers::cursor::{ByteReader, ByteWriter};

/// A record page slot: chain links plus the payload bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSlot {
    /// Location of the previous slot of the record, null for the first.
    pub prev_location: RecordLocation,
    /// Location of the next slot of the record, null for the last.
    pub next_location: RecordLocation,
    /// Payload bytes held by this slot.
    pub data: Vec<u8>,
}

impl RecordSlot {
    /// Serialized size of a slot with an empty payload: two locations, the
    /// payload length prefix and the checksum.
    pub const FIXED_STORAGE_SIZE: usize = 2 * 16 + 8 + 4;

    pub fn new(data: Vec<u8>) -> Self {
        Self {
            prev_location: RecordLocation::NULL,
            next_location: RecordLocation::NULL,
            data,
        }
    }

    /// Serialized size of this slot.
    pub fn storage_size(&self) -> usize {
        Self::FIXED_STORAGE_SIZE + self.data.len()
    }

    /// Decodes a slot from the reader's current position.
    pub fn load_from(reader: &mut ByteReader<'_>) -> PageResult<Self> {
        let start = reader.position();
        let prev_location =
            RecordLocation::read_from(reader).map_err(PageSlotParseError::Binary)?;
        let next_location =
            RecordLocation::read_from(reader).map_err(PageSlotParseError::Binary)?;
        let data = reader
            .read_buffer()
            .map_err(PageSlotParseError::Binary)?
            .to_vec();
        let covered = reader.span_since(start);
        let stored = reader
            .read::<u32>()
            .map_err(PageSlotParseError::Binary)?;
        PageCorruptError::verify(covered, stored)?;
        Ok(Self {
            prev_location,
            next_location,
            data,
        })
    }

    /// Encodes the slot at the writer's current position.
    pub fn dump_into(&self, writer: &mut ByteWriter<'_>) -> PageResult<()> {
        let start = writer.position();
        self.prev_location
            .write_to(writer)
            .map_err(PageSlotParseError::Binary)?;
        self.next_location
            .write_to(writer)
            .map_err(PageSlotParseError::Binary)?;
        writer
            .write_buffer(&self.data)
            .map_err(PageSlotParseError::Binary)?;
        let crc = checksum(writer.span_since(start));
        writer.write::<u32>(crc).map_err(PageSlotParseError::Binary)?;
        Ok(())
    }

    /// Decodes a slot from a standalone byte image.
    pub fn load(bytes: &[u8]) -> PageResult<Self> {
        Self::load_from(&mut ByteReader::new(bytes))
    }

    /// Encodes the slot into a standalone byte image of exactly
    /// `storage_size` bytes.
    pub fn dump(&self, output: &mut [u8]) -> PageResult<()> {
        if output.len() < self.storage_size() {
            return Err(PageSlotParseError::Truncated {
                needed: self.storage_size(),
                available: output.len(),
            }
            .into());
        }
        self.dump_into(&mut ByteWriter::new(output))
    }
}

#[cfg(test)]
mod record_slot_tests {
    use super::*;
    use crate::errors::page_error::PageError;

    #[test]
    fn fixed_storage_size_matches_empty_slot() {
        let slot = RecordSlot::default();
        assert_eq!(slot.storage_size(), RecordSlot::FIXED_STORAGE_SIZE);
        assert_eq!(RecordSlot::FIXED_STORAGE_SIZE, 44);
    }

    #[test]
    fn slot_round_trips_with_links() {
        let mut slot = RecordSlot::new(b"fragment payload".to_vec());
        slot.prev_location = RecordLocation::new(3, 1);
        slot.next_location = RecordLocation::new(4, 2);

        let mut bytes = vec![0u8; slot.storage_size()];
        slot.dump(&mut bytes).unwrap();
        let loaded = RecordSlot::load(&bytes).unwrap();
        assert_eq!(loaded, slot);
    }

    #[test]
    fn empty_slot_round_trips() {
        let slot = RecordSlot::default();
        let mut bytes = vec![0u8; slot.storage_size()];
        slot.dump(&mut bytes).unwrap();
        assert_eq!(RecordSlot::load(&bytes).unwrap(), slot);
    }

    #[test]
    fn flipped_payload_byte_is_detected() {
        let slot = RecordSlot::new(b"fragment payload".to_vec());
        let mut bytes = vec![0u8; slot.storage_size()];
        slot.dump(&mut bytes).unwrap();
        bytes[40] ^= 0xFF;
        assert!(matches!(
            RecordSlot::load(&bytes),
            Err(PageError::Corrupt(_))
        ));
    }

    #[test]
    fn dump_into_short_buffer_fails() {
        let slot = RecordSlot::new(vec![1, 2, 3]);
        let mut bytes = vec![0u8; slot.storage_size() - 1];
        assert!(slot.dump(&mut bytes).is_err());
    }
}
