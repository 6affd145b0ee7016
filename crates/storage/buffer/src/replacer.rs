//! Victim selection for a full buffer.

use page::location::PageId;

/// Tracks the resident pages and picks the eviction victim.
///
/// The buffer manager drives the replacer: `track` when a page becomes
/// resident, `forget` when it is evicted, `pin`/`unpin` around handle
/// lifetimes. A `victim` is only ever an unpinned page; with every
/// resident page pinned there is no victim.
///
/// Implementations are driven under the buffer manager's locks and do not
/// need interior synchronization. `pin` and `unpin` of ids that are not
/// tracked must be no-ops: a waiter can still unpin a page whose loader
/// already gave up on it.
pub trait Replacer: std::fmt::Debug + Send {
    /// Starts tracking a page that became resident.
    fn track(&mut self, page_id: PageId);

    /// Stops tracking an evicted page.
    fn forget(&mut self, page_id: PageId);

    /// Marks a use of the page and makes it ineligible for eviction.
    fn pin(&mut self, page_id: PageId);

    /// Releases one pin. Pins are counted; the page becomes evictable
    /// when the last pin is released.
    fn unpin(&mut self, page_id: PageId);

    /// Whether the page currently holds any pins.
    fn is_pinned(&self, page_id: PageId) -> bool;

    /// The page to evict, if any unpinned page is tracked.
    fn victim(&self) -> Option<PageId>;
}
