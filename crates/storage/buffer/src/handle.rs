//! RAII access to buffered pages.
//!
//! A [`PageHandle`] pins its page for as long as it lives; dropping the
//! handle releases the pin. All page access goes through the handle's
//! guards, so the buffer manager never exposes raw page references:
//! [`PageRef`] for reads and [`PageMut`] for writes. Dropping a write
//! guard is the modification notification: it marks the page dirty and
//! updates the free space list from the page's post-mutation insert
//! space.

use crate::cell::{CellState, PageCell};
use crate::manager::BufferManager;
use page::location::PageId;
use page::page::{Page, PageOperation};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, MutexGuard};

/// A pinned page. The pin is released when the handle drops.
#[derive(Debug)]
pub struct PageHandle<'a, P: Page> {
    manager: &'a BufferManager<P>,
    page_id: PageId,
    cell: Arc<PageCell<P>>,
}

impl<'a, P: Page> PageHandle<'a, P> {
    pub(crate) fn new(
        manager: &'a BufferManager<P>,
        page_id: PageId,
        cell: Arc<PageCell<P>>,
    ) -> Self {
        Self {
            manager,
            page_id,
            cell,
        }
    }

    /// Id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Latches the page for reading.
    pub fn read(&self) -> PageRef<'_, P> {
        PageRef {
            guard: self.lock_ready(),
        }
    }

    /// Latches the page for writing. The returned guard reports the
    /// mutation back to the buffer manager when dropped.
    pub fn write(&self) -> PageMut<'_, P> {
        PageMut {
            guard: self.lock_ready(),
            page_id: self.page_id,
            manager: self.manager,
        }
    }

    fn lock_ready(&self) -> MutexGuard<'_, CellState<P>> {
        let guard = self
            .cell
            .state
            .lock()
            .expect("buffer cell poisoned: a thread panicked while holding the latch");
        // A handle exists only for pages that finished loading, and a
        // pinned page cannot be evicted, so the state stays Ready.
        debug_assert!(matches!(*guard, CellState::Ready(_)));
        guard
    }
}

impl<P: Page> Drop for PageHandle<'_, P> {
    fn drop(&mut self) {
        self.manager.release_pin(self.page_id);
    }
}

/// Shared read access to a buffered page.
#[derive(Debug)]
pub struct PageRef<'h, P: Page> {
    guard: MutexGuard<'h, CellState<P>>,
}

impl<P: Page> Deref for PageRef<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        match &*self.guard {
            CellState::Ready(cached) => &cached.page,
            _ => unreachable!("handles only exist for ready pages"),
        }
    }
}

/// Exclusive write access to a buffered page.
#[derive(Debug)]
pub struct PageMut<'h, P: Page> {
    guard: MutexGuard<'h, CellState<P>>,
    page_id: PageId,
    manager: &'h BufferManager<P>,
}

impl<P: Page> Deref for PageMut<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        match &*self.guard {
            CellState::Ready(cached) => &cached.page,
            _ => unreachable!("handles only exist for ready pages"),
        }
    }
}

impl<P: Page> DerefMut for PageMut<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        match &mut *self.guard {
            CellState::Ready(cached) => &mut cached.page,
            _ => unreachable!("handles only exist for ready pages"),
        }
    }
}

impl<P: Page> Drop for PageMut<'_, P> {
    fn drop(&mut self) {
        let CellState::Ready(cached) = &mut *self.guard else {
            return;
        };
        cached.dirty = true;
        let has_insert_space = cached.page.free_space_size(PageOperation::Insert) > 0;
        self.manager
            .note_modified(self.page_id, has_insert_space);
    }
}
