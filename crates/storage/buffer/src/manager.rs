//! The buffer manager.

use crate::BufferError;
use crate::cell::{CachedPage, CellState, PageCell};
use crate::handle::PageHandle;
use crate::lru::LruReplacer;
use crate::replacer::Replacer;
use file::api::Storage;
use file::errors::StorageError;
use file::fsl::FreeSpaceList;
use page::location::PageId;
use page::page::Page;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Fewest page slots a buffer can be configured with: the record manager
/// needs two pages resident while relinking a fragment chain.
pub const MINIMUM_BUFFER_CAPACITY: usize = 2;

/// Invoked before a dirty page is written back to storage. The facade
/// registers a hook that flushes the write-ahead log, which keeps every
/// log record describing a page mutation durable before the page itself.
pub trait FlushHook: Send + Sync {
    fn before_page_write(&self, page_id: PageId) -> Result<(), Box<dyn Error + Send + Sync>>;
}

type DynReplacer = Box<dyn Replacer>;
type DynStorage<P> = Box<dyn Storage<P> + Send>;

/// A bounded cache of pages over a backend storage.
///
/// Concurrency model: the page table is under a `RwLock`; resolving a
/// resident page only takes the read lock. A miss takes the write lock,
/// installs a `Loading` cell and performs the storage read outside the
/// table lock, so concurrent misses for the same page produce exactly one
/// storage read while the losers wait on the cell's condvar. Pins are
/// taken while the table lock is held and eviction runs under the table
/// write lock, which is what keeps a pinned page from ever being chosen
/// as victim.
pub struct BufferManager<P: Page> {
    storage: Mutex<DynStorage<P>>,
    capacity: usize,
    cells: RwLock<HashMap<PageId, Arc<PageCell<P>>>>,
    replacer: Mutex<DynReplacer>,
    fsl: Mutex<FreeSpaceList>,
    flush_hook: Mutex<Option<Arc<dyn FlushHook>>>,
}

impl<P: Page> fmt::Debug for BufferManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferManager")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<P: Page> BufferManager<P> {
    /// Creates a buffer manager with the default LRU replacer.
    pub fn new(storage: DynStorage<P>, capacity: usize) -> Result<Self, BufferError> {
        Self::with_replacer(storage, capacity, Box::new(LruReplacer::new()))
    }

    /// Creates a buffer manager with a caller supplied replacer.
    pub fn with_replacer(
        storage: DynStorage<P>,
        capacity: usize,
        replacer: DynReplacer,
    ) -> Result<Self, BufferError> {
        if capacity < MINIMUM_BUFFER_CAPACITY {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        Ok(Self {
            storage: Mutex::new(storage),
            capacity,
            cells: RwLock::new(HashMap::new()),
            replacer: Mutex::new(replacer),
            fsl: Mutex::new(FreeSpaceList::new()),
            flush_hook: Mutex::new(None),
        })
    }

    /// Registers the write-ahead hook consulted before page write-backs.
    pub fn set_flush_hook(&self, hook: Arc<dyn FlushHook>) {
        *self.lock_hook() = Some(hook);
    }

    /// Opens the underlying storage and loads the free space list.
    pub fn start(&self) -> Result<(), BufferError> {
        let mut storage = self.lock_storage();
        storage.open()?;
        let fsl = storage.read_fsl()?;
        drop(storage);
        *self.lock_fsl() = fsl;
        Ok(())
    }

    /// Flushes every resident page and closes the storage.
    pub fn stop(&self) -> Result<(), BufferError> {
        self.flush_all()?;
        self.lock_storage().close()?;
        Ok(())
    }

    /// Returns a pinned handle for the page, loading it from storage when
    /// it is not resident.
    pub fn get(&self, page_id: PageId) -> Result<PageHandle<'_, P>, BufferError> {
        if page_id == 0 {
            return Err(StorageError::InvalidPageId.into());
        }

        // Fast path: the page is resident. Pinning happens under the
        // table lock so eviction (which takes the write lock) can never
        // interleave with it.
        {
            let cells = self.read_cells();
            if let Some(cell) = cells.get(&page_id) {
                let cell = Arc::clone(cell);
                self.lock_replacer().pin(page_id);
                drop(cells);
                return self.resolve(page_id, cell);
            }
        }

        // Miss: take the write lock and re-check, then become either the
        // single loader or a waiter.
        let (cell, is_loader) = {
            let mut cells = self.write_cells();
            if let Some(existing) = cells.get(&page_id) {
                let cell = Arc::clone(existing);
                self.lock_replacer().pin(page_id);
                (cell, false)
            } else {
                self.evict_to_capacity(&mut cells)?;
                let cell = Arc::new(PageCell::loading());
                cells.insert(page_id, Arc::clone(&cell));
                let mut replacer = self.lock_replacer();
                replacer.track(page_id);
                replacer.pin(page_id);
                (cell, true)
            }
        };

        if !is_loader {
            return self.resolve(page_id, cell);
        }

        // Perform the read outside the table lock.
        let loaded = self.lock_storage().read(page_id);
        match loaded {
            Ok(page) => {
                let mut state = self.lock_cell(&cell);
                *state = CellState::Ready(CachedPage { page, dirty: false });
                cell.ready.notify_all();
                drop(state);
                tracing::debug!(page_id, "page loaded into buffer");
                Ok(PageHandle::new(self, page_id, cell))
            }
            Err(error) => {
                {
                    let mut state = self.lock_cell(&cell);
                    *state = CellState::Failed;
                    cell.ready.notify_all();
                }
                {
                    let mut cells = self.write_cells();
                    if cells
                        .get(&page_id)
                        .is_some_and(|current| Arc::ptr_eq(current, &cell))
                    {
                        cells.remove(&page_id);
                    }
                }
                let mut replacer = self.lock_replacer();
                replacer.unpin(page_id);
                replacer.forget(page_id);
                Err(error.into())
            }
        }
    }

    /// Allocates a fresh page, installs it empty and registers it in the
    /// free space list.
    pub fn get_new(&self) -> Result<PageHandle<'_, P>, BufferError> {
        let (page_id, page_size) = {
            let mut storage = self.lock_storage();
            (storage.allocate(), storage.page_size())
        };
        let page = P::with_size(page_id, page_size);

        {
            let mut cells = self.write_cells();
            self.evict_to_capacity(&mut cells)?;
            // Dirty from birth: the empty page must survive eviction even
            // if nothing is ever inserted into it.
            let cell = Arc::new(PageCell::ready(page, true));
            cells.insert(page_id, Arc::clone(&cell));
            let mut replacer = self.lock_replacer();
            replacer.track(page_id);
            replacer.pin(page_id);
            drop(replacer);
            self.lock_fsl().insert(page_id);
            tracing::debug!(page_id, "new page installed");
            Ok(PageHandle::new(self, page_id, cell))
        }
    }

    /// Returns a handle for some page with insert space, allocating a new
    /// page when the free space list is empty.
    pub fn get_free(&self) -> Result<PageHandle<'_, P>, BufferError> {
        let pick = self.lock_fsl().pick();
        match pick {
            Some(page_id) => self.get(page_id),
            None => self.get_new(),
        }
    }

    /// Writes the page back if it is resident, dirty and unpinned. A
    /// pinned page is skipped: an operation is still in progress on it.
    pub fn flush(&self, page_id: PageId) -> Result<(), BufferError> {
        let cell = self.read_cells().get(&page_id).cloned();
        let Some(cell) = cell else {
            return Ok(());
        };
        if self.lock_replacer().is_pinned(page_id) {
            return Ok(());
        }
        self.flush_cell(page_id, &cell)
    }

    /// Flushes every resident page.
    pub fn flush_all(&self) -> Result<(), BufferError> {
        let page_ids: Vec<PageId> = self.read_cells().keys().copied().collect();
        for page_id in page_ids {
            self.flush(page_id)?;
        }
        Ok(())
    }

    /// Number of pages allocated in the underlying storage.
    pub fn page_count(&self) -> u64 {
        self.lock_storage().page_count()
    }

    /// Page size of the underlying storage.
    pub fn page_size(&self) -> usize {
        self.lock_storage().page_size()
    }

    /// Snapshot of the free space list members.
    pub fn free_page_ids(&self) -> Vec<PageId> {
        self.lock_fsl().page_ids()
    }

    /// Waits for a cell to finish loading and wraps it in a handle.
    fn resolve(
        &self,
        page_id: PageId,
        cell: Arc<PageCell<P>>,
    ) -> Result<PageHandle<'_, P>, BufferError> {
        if !cell.wait_until_ready() {
            self.lock_replacer().unpin(page_id);
            return Err(BufferError::LoadFailed(page_id));
        }
        Ok(PageHandle::new(self, page_id, cell))
    }

    /// Evicts victims until a new page fits. Runs under the table write
    /// lock passed in by the caller.
    fn evict_to_capacity(
        &self,
        cells: &mut HashMap<PageId, Arc<PageCell<P>>>,
    ) -> Result<(), BufferError> {
        while cells.len() >= self.capacity {
            let victim = self
                .lock_replacer()
                .victim()
                .ok_or(BufferError::NoEvictablePage)?;
            let cell = cells
                .get(&victim)
                .cloned()
                .unwrap_or_else(|| unreachable!("replacer only tracks resident pages"));
            // A failed flush leaves the page resident and dirty.
            self.flush_cell(victim, &cell)?;
            cells.remove(&victim);
            self.lock_replacer().forget(victim);
            tracing::debug!(page_id = victim, "page evicted");
        }
        Ok(())
    }

    /// Persists a dirty cell: write-ahead hook first, then the free space
    /// list snapshot, then the page image.
    fn flush_cell(&self, page_id: PageId, cell: &Arc<PageCell<P>>) -> Result<(), BufferError> {
        let mut state = self.lock_cell(cell);
        let CellState::Ready(cached) = &mut *state else {
            return Ok(());
        };
        if !cached.dirty {
            return Ok(());
        }

        let hook = self.lock_hook().clone();
        if let Some(hook) = hook {
            hook.before_page_write(page_id)
                .map_err(|source| BufferError::FlushHook { page_id, source })?;
        }

        let snapshot = self.lock_fsl().clone();
        let mut storage = self.lock_storage();
        storage.write_fsl(&snapshot)?;
        storage.write(&cached.page)?;
        cached.dirty = false;
        tracing::debug!(page_id, "page flushed");
        Ok(())
    }

    /// Modification notification from a dropped write guard: the page is
    /// dirty now, and its free space decides its free space list
    /// membership.
    pub(crate) fn note_modified(&self, page_id: PageId, has_insert_space: bool) {
        let mut fsl = self.lock_fsl();
        if has_insert_space {
            fsl.insert(page_id);
        } else {
            fsl.erase(page_id);
        }
    }

    pub(crate) fn release_pin(&self, page_id: PageId) {
        self.lock_replacer().unpin(page_id);
    }

    fn read_cells(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PageId, Arc<PageCell<P>>>> {
        self.cells
            .read()
            .expect("buffer page table poisoned: a thread panicked while holding the lock")
    }

    fn write_cells(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PageId, Arc<PageCell<P>>>> {
        self.cells
            .write()
            .expect("buffer page table poisoned: a thread panicked while holding the lock")
    }

    fn lock_replacer(&self) -> MutexGuard<'_, DynReplacer> {
        self.replacer
            .lock()
            .expect("replacer poisoned: a thread panicked while holding the lock")
    }

    fn lock_storage(&self) -> MutexGuard<'_, DynStorage<P>> {
        self.storage
            .lock()
            .expect("storage poisoned: a thread panicked while holding the lock")
    }

    fn lock_fsl(&self) -> MutexGuard<'_, FreeSpaceList> {
        self.fsl
            .lock()
            .expect("free space list poisoned: a thread panicked while holding the lock")
    }

    fn lock_hook(&self) -> MutexGuard<'_, Option<Arc<dyn FlushHook>>> {
        self.flush_hook
            .lock()
            .expect("flush hook poisoned: a thread panicked while holding the lock")
    }

    fn lock_cell<'c>(&self, cell: &'c PageCell<P>) -> MutexGuard<'c, CellState<P>> {
        cell.state
            .lock()
            .expect("buffer cell poisoned: a thread panicked while holding the latch")
    }
}
