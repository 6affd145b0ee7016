use crate::errors::parse_error::{PageCorruptError, PageParseError, PageSlotParseError};
use crate::journal::JournalError;
use crate::location::{PageId, SeqNumber, SlotId};
use thiserror::Error;

/// Public facing error type returned by page operations.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("slot {slot_id} not found in page {page_id}")]
    SlotNotFound { page_id: PageId, slot_id: SlotId },
    #[error("no log slot for sequence number {seq_number} in page {page_id}")]
    LogSlotNotFound {
        page_id: PageId,
        seq_number: SeqNumber,
    },
    #[error("failed to parse page")]
    Parse(#[from] PageParseError),
    #[error("failed to parse page slot")]
    SlotParse(#[from] PageSlotParseError),
    #[error("page data corrupt")]
    Corrupt(#[from] PageCorruptError),
    #[error("failed to journal page mutation")]
    Journal(#[from] JournalError),
}

/// Result type of page operations.
pub type PageResult<T> = Result<T, PageError>;
