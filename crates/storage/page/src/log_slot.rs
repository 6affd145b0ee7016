//! A single slot of a log page.
//!
//! A log record that does not fit in one page is split across slots on
//! successive pages. Every fragment carries the record's sequence number;
//! the `next_location` link points at the continuation, null for the last
//! fragment.

use crate::errors::page_error::PageResult;
use crate::errors::parse_error::{PageCorruptError, PageSlotParseError};
use crate::location::{LogLocation, SeqNumber};
use binary_helpers::checksum::checksum;
use binary_helpers::cursor::{ByteReader, ByteWriter};

/// One fragment of a serialized log record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSlot {
    /// Sequence number of the log record this fragment belongs to.
    pub seq_number: SeqNumber,
    /// Location of the continuation fragment, null for the last one.
    pub next_location: LogLocation,
    /// Fragment payload.
    pub data: Vec<u8>,
}

impl LogSlot {
    /// Serialized size of a slot with an empty payload: sequence number,
    /// next location, payload length prefix and checksum.
    pub const FIXED_STORAGE_SIZE: usize = 8 + 16 + 8 + 4;

    pub fn new(seq_number: SeqNumber) -> Self {
        Self {
            seq_number,
            next_location: LogLocation::NULL,
            data: Vec::new(),
        }
    }

    /// Serialized size of this slot.
    pub fn storage_size(&self) -> usize {
        Self::FIXED_STORAGE_SIZE + self.data.len()
    }

    /// Decodes a slot from the reader's current position.
    pub fn load_from(reader: &mut ByteReader<'_>) -> PageResult<Self> {
        let start = reader.position();
        let seq_number = reader.read::<u64>().map_err(PageSlotParseError::Binary)?;
        let next_location = LogLocation::read_from(reader).map_err(PageSlotParseError::Binary)?;
        let data = reader
            .read_buffer()
            .map_err(PageSlotParseError::Binary)?
            .to_vec();
        let covered = reader.span_since(start);
        let stored = reader.read::<u32>().map_err(PageSlotParseError::Binary)?;
        PageCorruptError::verify(covered, stored)?;
        Ok(Self {
            seq_number,
            next_location,
            data,
        })
    }

    /// Encodes the slot at the writer's current position.
    pub fn dump_into(&self, writer: &mut ByteWriter<'_>) -> PageResult<()> {
        let start = writer.position();
        writer
            .write::<u64>(self.seq_number)
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
}
