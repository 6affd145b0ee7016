//! The journaling seam between record pages and the transaction layer.
//!
//! Every mutating record page operation takes a journal and reports the
//! mutation *before* touching the in-memory page, so the write-ahead
//! ordering (log record first, page mutation second) is enforced at the
//! page boundary rather than trusted to each caller. The transaction type
//! in the `txn` crate is the production implementation; it turns each call
//! into a log record appended through the log manager.

use crate::location::RecordLocation;
use crate::record_slot::RecordSlot;
use std::error::Error;
use thiserror::Error;

/// Failure raised by a journal implementation. Carries the underlying
/// error of whatever log transport the journal writes to.
#[derive(Debug, Error)]
#[error("journal write failed")]
pub struct JournalError(#[source] Box<dyn Error + Send + Sync>);

impl JournalError {
    pub fn new(source: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(source))
    }
}

/// Sink for record page mutations.
pub trait SlotJournal {
    /// Called before a slot is placed at `location`.
    fn journal_insert(
        &mut self,
        location: RecordLocation,
        slot: &RecordSlot,
    ) -> Result<(), JournalError>;

    /// Called before the slot at `location` is replaced. `before` is the
    /// current slot value, `after` the incoming one.
    fn journal_update(
        &mut self,
        location: RecordLocation,
        before: &RecordSlot,
        after: &RecordSlot,
    ) -> Result<(), JournalError>;

    /// Called before the slot at `location` is removed.
    fn journal_remove(
        &mut self,
        location: RecordLocation,
        slot: &RecordSlot,
    ) -> Result<(), JournalError>;
}
