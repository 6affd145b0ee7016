//! The in-memory slot a cached page lives in.

use page::page::Page;
use std::sync::{Condvar, Mutex};

/// A resident page plus its dirty flag.
#[derive(Debug)]
pub(crate) struct CachedPage<P> {
    pub(crate) page: P,
    pub(crate) dirty: bool,
}

/// Lifecycle of a buffer cell. A cell starts `Loading` while exactly one
/// thread reads the page from storage; every other thread asking for the
/// same page waits on the condvar until the state flips.
#[derive(Debug)]
pub(crate) enum CellState<P> {
    Loading,
    Ready(CachedPage<P>),
    Failed,
}

/// One entry of the buffer's page table.
#[derive(Debug)]
pub(crate) struct PageCell<P> {
    pub(crate) state: Mutex<CellState<P>>,
    pub(crate) ready: Condvar,
}

impl<P: Page> PageCell<P> {
    pub(crate) fn loading() -> Self {
        Self {
            state: Mutex::new(CellState::Loading),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn ready(page: P, dirty: bool) -> Self {
        Self {
            state: Mutex::new(CellState::Ready(CachedPage { page, dirty })),
            ready: Condvar::new(),
        }
    }

    /// Blocks until the cell leaves `Loading`. Returns whether the page is
    /// actually available.
    pub(crate) fn wait_until_ready(&self) -> bool {
        let mut state = self
            .state
            .lock()
            .expect("buffer cell poisoned: a thread panicked while holding the latch");
        loop {
            match &*state {
                CellState::Ready(_) => return true,
                CellState::Failed => return false,
                CellState::Loading => {
                    state = self
                        .ready
                        .wait(state)
                        .expect("buffer cell poisoned: a thread panicked while holding the latch");
                }
            }
        }
    }
}
