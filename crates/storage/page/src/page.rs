//! The capability set every page variant implements.

use crate::errors::page_error::PageResult;
use crate::location::PageId;

/// Smallest page size the engine accepts.
pub const MINIMUM_PAGE_SIZE: usize = 512;

/// Default size of a data page.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Default size of a log page. The write-ahead log favors larger pages so
/// most log records fit in a single slot.
pub const DEFAULT_LOG_PAGE_SIZE: usize = 2048;

/// The operation a free space query is sized for. An insert pays for a new
/// entry in the page header on top of the payload, an update does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOperation {
    Insert,
    Update,
}

/// Capabilities shared by all page variants.
///
/// The storage layer is generic over this trait: `P::load` is the
/// registered constructor for the variant, so a storage opened for one
/// page type can only ever materialize that type. The documented disk
/// layouts carry no type tag.
pub trait Page: std::fmt::Debug + Send + 'static {
    /// Creates an empty page of the given size.
    fn with_size(page_id: PageId, page_size: usize) -> Self
    where
        Self: Sized;

    /// The page identifier.
    fn id(&self) -> PageId;

    /// Free bytes available for the given operation.
    fn free_space_size(&self, operation: PageOperation) -> usize;

    /// Size of the serialized page, i.e. the page size.
    fn storage_size(&self) -> usize;

    /// Deserializes a page from its byte image. The image length is the
    /// page size.
    fn load(bytes: &[u8]) -> PageResult<Self>
    where
        Self: Sized;

    /// Serializes the page into `output`, which must be exactly
    /// `storage_size` bytes long.
    fn dump(&self, output: &mut [u8]) -> PageResult<()>;
}
