//! The log record.
//!
//! A record carries what is needed to roll a transaction's operation back
//! or forward: its own sequence number, the location of the transaction's
//! previous log record (the undo chain), the transaction id, a kind tag
//! and up to two page slot images. Recovery depends on byte-exact replay,
//! so the codec is fixed layout and the type implements equality.

use crate::errors::{LogRecordCorruptError, LogRecordParseError, WalError};
use binary_helpers::checksum::checksum;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use page::location::{LogLocation, RecordLocation, SeqNumber, TransactionId};
use page::record_slot::RecordSlot;

/// What a log record describes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRecordKind {
    /// A transaction began.
    Begin = 0,
    /// A page slot was inserted.
    Insert = 1,
    /// A page slot was replaced; both images are carried.
    Update = 2,
    /// A page slot was removed; the removed image is carried.
    Delete = 3,
    /// A transaction rolled back completely.
    Abort = 4,
    /// A transaction committed.
    Commit = 5,
}

impl From<LogRecordKind> for u8 {
    fn from(kind: LogRecordKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for LogRecordKind {
    type Error = LogRecordParseError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(LogRecordKind::Begin),
            1 => Ok(LogRecordKind::Insert),
            2 => Ok(LogRecordKind::Update),
            3 => Ok(LogRecordKind::Delete),
            4 => Ok(LogRecordKind::Abort),
            5 => Ok(LogRecordKind::Commit),
            _ => Err(LogRecordParseError::UnknownKind(tag)),
        }
    }
}

/// One entry of the write-ahead log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Assigned by the log manager on append; `0` until then.
    seq_number: SeqNumber,
    /// Location of the transaction's previous log record, null for BEGIN.
    prev_record_location: LogLocation,
    transaction_id: TransactionId,
    kind: LogRecordKind,
    /// The record slot the operation targeted; null for lifecycle records.
    location: RecordLocation,
    /// First page slot image: the inserted or removed slot, or the
    /// before image of an update. Empty when the kind carries none.
    slot_a: RecordSlot,
    /// Second page slot image: the after image of an update. Empty
    /// otherwise.
    slot_b: RecordSlot,
}

impl LogRecord {
    /// A BEGIN record, opening a transaction's log chain.
    pub fn begin(transaction_id: TransactionId) -> Self {
        Self::lifecycle(transaction_id, LogLocation::NULL, LogRecordKind::Begin)
    }

    /// A COMMIT record.
    pub fn commit(transaction_id: TransactionId, prev: LogLocation) -> Self {
        Self::lifecycle(transaction_id, prev, LogRecordKind::Commit)
    }

    /// An ABORT record.
    pub fn abort(transaction_id: TransactionId, prev: LogLocation) -> Self {
        Self::lifecycle(transaction_id, prev, LogRecordKind::Abort)
    }

    /// An INSERT record carrying the inserted slot.
    pub fn insert(
        transaction_id: TransactionId,
        prev: LogLocation,
        location: RecordLocation,
        slot: RecordSlot,
    ) -> Self {
        Self {
            seq_number: 0,
            prev_record_location: prev,
            transaction_id,
            kind: LogRecordKind::Insert,
            location,
            slot_a: slot,
            slot_b: RecordSlot::default(),
        }
    }

    /// A DELETE record carrying the removed slot.
    pub fn delete(
        transaction_id: TransactionId,
        prev: LogLocation,
        location: RecordLocation,
        slot: RecordSlot,
    ) -> Self {
        Self {
            seq_number: 0,
            prev_record_location: prev,
            transaction_id,
            kind: LogRecordKind::Delete,
            location,
            slot_a: slot,
            slot_b: RecordSlot::default(),
        }
    }

    /// An UPDATE record carrying the before and after images.
    pub fn update(
        transaction_id: TransactionId,
        prev: LogLocation,
        location: RecordLocation,
        before: RecordSlot,
        after: RecordSlot,
    ) -> Self {
        Self {
            seq_number: 0,
            prev_record_location: prev,
            transaction_id,
            kind: LogRecordKind::Update,
            location,
            slot_a: before,
            slot_b: after,
        }
    }

    fn lifecycle(
        transaction_id: TransactionId,
        prev: LogLocation,
        kind: LogRecordKind,
    ) -> Self {
        Self {
            seq_number: 0,
            prev_record_location: prev,
            transaction_id,
            kind,
            location: RecordLocation::NULL,
            slot_a: RecordSlot::default(),
            slot_b: RecordSlot::default(),
        }
    }

    pub fn seq_number(&self) -> SeqNumber {
        self.seq_number
    }

    pub(crate) fn set_seq_number(&mut self, seq_number: SeqNumber) {
        self.seq_number = seq_number;
    }

    /// Location of the previous log record of the same transaction.
    pub fn prev_record_location(&self) -> LogLocation {
        self.prev_record_location
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn kind(&self) -> LogRecordKind {
        self.kind
    }

    /// The record slot the logged operation targeted.
    pub fn location(&self) -> RecordLocation {
        self.location
    }

    /// Inserted/removed slot, or the before image of an update.
    pub fn slot_a(&self) -> &RecordSlot {
        &self.slot_a
    }

    /// After image of an update.
    pub fn slot_b(&self) -> &RecordSlot {
        &self.slot_b
    }

    /// Serialized size: header, kind tag, target location, both slot
    /// images, checksum.
    pub fn storage_size(&self) -> usize {
        (8 + 16 + 8) + 1 + 16 + self.slot_a.storage_size() + self.slot_b.storage_size() + 4
    }

    /// Encodes the record into `output`, which must be at least
    /// `storage_size` bytes long.
    pub fn dump(&self, output: &mut [u8]) -> Result<(), WalError> {
        if output.len() < self.storage_size() {
            return Err(LogRecordParseError::Truncated {
                needed: self.storage_size(),
                available: output.len(),
            }
            .into());
        }
        let mut writer = ByteWriter::new(output);
        writer
            .write::<u64>(self.seq_number)
            .map_err(LogRecordParseError::Binary)?;
        self.prev_record_location
            .write_to(&mut writer)
            .map_err(LogRecordParseError::Binary)?;
        writer
            .write::<u64>(self.transaction_id)
            .map_err(LogRecordParseError::Binary)?;
        writer
            .write::<u8>(self.kind.into())
            .map_err(LogRecordParseError::Binary)?;
        self.location
            .write_to(&mut writer)
            .map_err(LogRecordParseError::Binary)?;
        self.slot_a
            .dump_into(&mut writer)
            .map_err(LogRecordParseError::Slot)?;
        self.slot_b
            .dump_into(&mut writer)
            .map_err(LogRecordParseError::Slot)?;
        let crc = checksum(writer.written());
        writer
            .write::<u32>(crc)
            .map_err(LogRecordParseError::Binary)?;
        Ok(())
    }

    /// Decodes a record from its byte image.
    pub fn load(bytes: &[u8]) -> Result<Self, WalError> {
        let mut reader = ByteReader::new(bytes);
        let seq_number = reader.read::<u64>().map_err(LogRecordParseError::Binary)?;
        let prev_record_location =
            LogLocation::read_from(&mut reader).map_err(LogRecordParseError::Binary)?;
        let transaction_id = reader.read::<u64>().map_err(LogRecordParseError::Binary)?;
        let kind = LogRecordKind::try_from(
            reader.read::<u8>().map_err(LogRecordParseError::Binary)?,
        )?;
        let location =
            RecordLocation::read_from(&mut reader).map_err(LogRecordParseError::Binary)?;
        let slot_a = RecordSlot::load_from(&mut reader).map_err(LogRecordParseError::Slot)?;
        let slot_b = RecordSlot::load_from(&mut reader).map_err(LogRecordParseError::Slot)?;
        let covered = reader.consumed();
        let stored = reader.read::<u32>().map_err(LogRecordParseError::Binary)?;
        let computed = checksum(covered);
        if stored != computed {
            return Err(LogRecordCorruptError { stored, computed }.into());
        }
        Ok(Self {
            seq_number,
            prev_record_location,
            transaction_id,
            kind,
            location,
            slot_a,
            slot_b,
        })
    }
}
