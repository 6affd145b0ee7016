use binary_helpers::bin_error::BinaryError;
use thiserror::Error;

/// Failure while decoding or encoding a page image.
#[derive(Debug, Error)]
pub enum PageParseError {
    #[error("page byte image too small: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("encoded slot count {slot_count} cannot fit in the header region of a {page_size} byte page")]
    SlotCountOverflow { slot_count: u64, page_size: usize },
    #[error("slot span at offset {offset} with size {size} falls outside a {page_size} byte page")]
    SpanOutOfBounds {
        offset: u64,
        size: u64,
        page_size: usize,
    },
    #[error("error while interpreting binary data")]
    Binary(#[from] BinaryError),
}

/// Failure while decoding or encoding a page slot.
#[derive(Debug, Error)]
pub enum PageSlotParseError {
    #[error("slot byte image too small: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("error while interpreting binary data")]
    Binary(#[from] BinaryError),
}

/// A stored checksum did not match the recomputed one.
#[derive(Debug, Error)]
#[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
pub struct PageCorruptError {
    pub stored: u32,
    pub computed: u32,
}

impl PageCorruptError {
    /// Verifies `stored` against the checksum of `covered`.
    pub fn verify(covered: &[u8], stored: u32) -> Result<(), PageCorruptError> {
        let computed = binary_helpers::checksum::checksum(covered);
        if computed != stored {
            return Err(PageCorruptError { stored, computed });
        }
        Ok(())
    }
}
