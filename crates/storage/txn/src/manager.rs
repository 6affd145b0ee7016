//! The transaction manager.

use crate::TxnError;
use crate::transaction::{Transaction, TransactionState};
use buffer::manager::BufferManager;
use page::record_page::RecordPage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use wal::log_record::{LogRecord, LogRecordKind};
use wal::manager::LogManager;

/// Begins, commits and aborts transactions over the record buffer.
#[derive(Debug)]
pub struct TransactionManager {
    buffer: Arc<BufferManager<RecordPage>>,
    log_manager: Arc<LogManager>,
    /// Source of transaction ids, unique within the process lifetime.
    next_id: AtomicU64,
}

impl TransactionManager {
    pub fn new(buffer: Arc<BufferManager<RecordPage>>, log_manager: Arc<LogManager>) -> Self {
        Self {
            buffer,
            log_manager,
            next_id: AtomicU64::new(1),
        }
    }

    /// Begins a new transaction. The BEGIN record opens its log chain.
    pub fn begin(&self) -> Result<Transaction, TxnError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut txn = Transaction::new(id, Arc::clone(&self.log_manager));
        let location = self.log_manager.add(LogRecord::begin(id))?;
        txn.set_log_location(location);
        tracing::debug!(transaction_id = id, "transaction began");
        Ok(txn)
    }

    /// Rolls back every operation of the transaction by walking its log
    /// chain from the tail and applying the inverse of each record. The
    /// inverse operations are journaled themselves, so an abort that is
    /// cut short can be aborted again. No flush is forced: recovery
    /// treats any transaction without a COMMIT as aborted.
    pub fn abort(&self, txn: &mut Transaction) -> Result<(), TxnError> {
        if txn.is_terminal() {
            return Ok(());
        }

        let mut record = self.log_manager.get(txn.log_location())?;
        self.undo(txn, &record)?;
        while !record.prev_record_location().is_null() {
            record = self.log_manager.get(record.prev_record_location())?;
            self.undo(txn, &record)?;
        }

        let location = self
            .log_manager
            .add(LogRecord::abort(txn.id(), txn.log_location()))?;
        txn.set_log_location(location);
        txn.set_state(TransactionState::Aborted);
        tracing::debug!(transaction_id = txn.id(), "transaction aborted");
        Ok(())
    }

    /// Commits the transaction: the COMMIT record is appended and the log
    /// flushed before anything else, which is what makes the commit
    /// durable. With `force` set, every staged page is flushed too and
    /// the transaction reaches `Committed`; otherwise it stays
    /// `PartiallyCommitted` and the pages are written back lazily.
    pub fn commit(&self, txn: &mut Transaction, force: bool) -> Result<(), TxnError> {
        if txn.is_terminal() {
            return Ok(());
        }

        let location = self
            .log_manager
            .add(LogRecord::commit(txn.id(), txn.log_location()))?;
        txn.set_log_location(location);
        self.log_manager.flush()?;
        txn.set_state(TransactionState::PartiallyCommitted);

        if force {
            let staged: Vec<_> = txn.staged().collect();
            for page_id in staged {
                self.buffer.flush(page_id)?;
            }
            txn.set_state(TransactionState::Committed);
        }
        tracing::debug!(transaction_id = txn.id(), force, "transaction committed");
        Ok(())
    }

    /// Applies the inverse of one logged operation.
    fn undo(&self, txn: &mut Transaction, record: &LogRecord) -> Result<(), TxnError> {
        match record.kind() {
            LogRecordKind::Insert => {
                let handle = self.buffer.get(record.location().page_id)?;
                let mut page = handle.write();
                page.remove_slot(record.location().slot_id, txn)?;
            }
            LogRecordKind::Delete => {
                let handle = self.buffer.get(record.location().page_id)?;
                let mut page = handle.write();
                page.undo_remove_slot(record.location().slot_id, record.slot_a().clone(), txn)?;
            }
            LogRecordKind::Update => {
                let handle = self.buffer.get(record.location().page_id)?;
                let mut page = handle.write();
                page.update_slot(record.location().slot_id, record.slot_a().clone(), txn)?;
            }
            // Lifecycle records carry nothing to invert.
            LogRecordKind::Begin | LogRecordKind::Commit | LogRecordKind::Abort => {}
        }
        Ok(())
    }
}
