//! The transaction value.

use page::journal::{JournalError, SlotJournal};
use page::location::{LogLocation, PageId, RecordLocation, TransactionId};
use page::record_slot::RecordSlot;
use std::collections::BTreeSet;
use std::sync::Arc;
use wal::log_record::LogRecord;
use wal::manager::LogManager;

/// Lifecycle of a transaction.
///
/// `Committed` and `Aborted` are terminal. A non-force commit stops at
/// `PartiallyCommitted`: the log is durable, the touched pages are
/// written back lazily by eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    PartiallyCommitted,
    Committed,
    Aborted,
}

/// A unit of atomic work over the record buffer.
///
/// The transaction is the journal its page mutations write through: each
/// journaled operation becomes a log record whose `prev` pointer is the
/// transaction's current log tail, and the tail then moves to the new
/// record. The page the operation touched joins the staged set, which a
/// force commit flushes.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    /// Location of the transaction's most recent log record.
    log_location: LogLocation,
    /// Pages dirtied by this transaction.
    staged: BTreeSet<PageId>,
    log_manager: Arc<LogManager>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, log_manager: Arc<LogManager>) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            log_location: LogLocation::NULL,
            staged: BTreeSet::new(),
            log_manager,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TransactionState) {
        self.state = state;
    }

    /// Whether the transaction reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            TransactionState::Committed | TransactionState::Aborted
        )
    }

    /// Location of the transaction's most recent log record: the tail of
    /// its undo chain.
    pub fn log_location(&self) -> LogLocation {
        self.log_location
    }

    pub(crate) fn set_log_location(&mut self, location: LogLocation) {
        self.log_location = location;
    }

    /// The pages this transaction has dirtied.
    pub fn staged(&self) -> impl Iterator<Item = PageId> + '_ {
        self.staged.iter().copied()
    }

    /// Appends a log record and advances the transaction's log tail.
    fn append(&mut self, record: LogRecord) -> Result<(), JournalError> {
        let location = self.log_manager.add(record).map_err(JournalError::new)?;
        self.log_location = location;
        Ok(())
    }
}

impl SlotJournal for Transaction {
    fn journal_insert(
        &mut self,
        location: RecordLocation,
        slot: &RecordSlot,
    ) -> Result<(), JournalError> {
        let record = LogRecord::insert(self.id, self.log_location, location, slot.clone());
        self.append(record)?;
        self.staged.insert(location.page_id);
        Ok(())
    }

    fn journal_update(
        &mut self,
        location: RecordLocation,
        before: &RecordSlot,
        after: &RecordSlot,
    ) -> Result<(), JournalError> {
        let record = LogRecord::update(
            self.id,
            self.log_location,
            location,
            before.clone(),
            after.clone(),
        );
        self.append(record)?;
        self.staged.insert(location.page_id);
        Ok(())
    }

    fn journal_remove(
        &mut self,
        location: RecordLocation,
        slot: &RecordSlot,
    ) -> Result<(), JournalError> {
        let record = LogRecord::delete(self.id, self.log_location, location, slot.clone());
        self.append(record)?;
        self.staged.insert(location.page_id);
        Ok(())
    }
}
