//! The store facade.

use crate::config::StoreConfig;
use crate::connection::ConnectionString;
use crate::errors::Error;
use buffer::manager::{BufferManager, FlushHook};
use file::factory::open_storage;
use page::location::{PageId, RecordLocation};
use page::log_page::LogPage;
use page::record_page::RecordPage;
use std::sync::Arc;
use storage_api::record_manager::RecordManager;
use txn::manager::TransactionManager;
use txn::transaction::Transaction;
use wal::manager::LogManager;

/// Flushes the write-ahead log before any data page reaches storage, so
/// a page write never outruns the log records describing it.
struct WalFlushHook(Arc<LogManager>);

impl FlushHook for WalFlushHook {
    fn before_page_write(
        &self,
        _page_id: PageId,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.0.flush().map_err(|error| Box::new(error) as _)
    }
}

/// An opened storage engine: record storage, page cache, write-ahead log
/// and transactions wired together.
///
/// All state is reachable from this value; there are no globals. The
/// store is safe to share across threads behind an `Arc`.
#[derive(Debug)]
pub struct Store {
    buffer: Arc<BufferManager<RecordPage>>,
    log_manager: Arc<LogManager>,
    txn_manager: TransactionManager,
    records: RecordManager,
}

impl Store {
    /// Opens (or creates) the store addressed by `connection`.
    pub fn open(connection: &str, config: StoreConfig) -> Result<Self, Error> {
        config.validate()?;
        let conn = ConnectionString::parse(connection)?;

        let data_storage = open_storage::<RecordPage>(&conn.data_target(), config.page_size)?;
        let log_storage = open_storage::<LogPage>(&conn.log_target(), config.log_page_size)?;

        let buffer = Arc::new(BufferManager::new(
            data_storage,
            config.buffer_capacity.get(),
        )?);
        let log_manager = Arc::new(LogManager::new(
            log_storage,
            config.log_buffer_capacity.get(),
        )?);

        log_manager.start()?;
        buffer.set_flush_hook(Arc::new(WalFlushHook(Arc::clone(&log_manager))));
        buffer.start()?;

        let txn_manager = TransactionManager::new(Arc::clone(&buffer), Arc::clone(&log_manager));
        let records = RecordManager::new(Arc::clone(&buffer));
        records.start();

        tracing::info!(connection, "store opened");
        Ok(Self {
            buffer,
            log_manager,
            txn_manager,
            records,
        })
    }

    /// Flushes everything and closes the backing storages.
    pub fn close(&mut self) -> Result<(), Error> {
        self.records.stop();
        self.buffer.stop()?;
        self.log_manager.stop()?;
        tracing::info!("store closed");
        Ok(())
    }

    /// Begins a new transaction.
    pub fn begin(&self) -> Result<Transaction, Error> {
        Ok(self.txn_manager.begin()?)
    }

    /// Commits a transaction. With `force` set, every page the
    /// transaction dirtied is flushed before this returns.
    pub fn commit(&self, txn: &mut Transaction, force: bool) -> Result<(), Error> {
        Ok(self.txn_manager.commit(txn, force)?)
    }

    /// Rolls a transaction back.
    pub fn abort(&self, txn: &mut Transaction) -> Result<(), Error> {
        Ok(self.txn_manager.abort(txn)?)
    }

    /// Inserts a record and returns its location.
    pub fn insert(&self, txn: &mut Transaction, data: &[u8]) -> Result<RecordLocation, Error> {
        Ok(self.records.insert(txn, data)?)
    }

    /// Reads the record at `location`.
    pub fn read(&self, txn: &Transaction, location: RecordLocation) -> Result<Vec<u8>, Error> {
        Ok(self.records.read(txn, location)?)
    }

    /// Rewrites the record at `location`.
    pub fn update(
        &self,
        txn: &mut Transaction,
        location: RecordLocation,
        data: &[u8],
    ) -> Result<(), Error> {
        Ok(self.records.update(txn, location, data)?)
    }

    /// Removes the record at `location`.
    pub fn remove(&self, txn: &mut Transaction, location: RecordLocation) -> Result<(), Error> {
        Ok(self.records.remove(txn, location)?)
    }

    /// Number of data pages allocated so far.
    pub fn page_count(&self) -> u64 {
        self.buffer.page_count()
    }

    /// Snapshot of the pages known to have insert space.
    pub fn free_page_ids(&self) -> Vec<PageId> {
        self.buffer.free_page_ids()
    }

    /// The write-ahead log manager.
    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.log_manager
    }

    /// The record page buffer manager.
    pub fn buffer(&self) -> &Arc<BufferManager<RecordPage>> {
        &self.buffer
    }
}
