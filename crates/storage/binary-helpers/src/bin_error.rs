use thiserror::Error;

/// Errors raised while interpreting raw bytes.
#[derive(Debug, Error)]
pub enum BinaryError {
    #[error(
        "attempt to access {expected} bytes at offset {from_offset}, but the slice does not contain that range"
    )]
    SliceOutOfRange { expected: usize, from_offset: usize },
    #[error("buffer exhausted: needed {needed} more bytes, {remaining} remaining")]
    Exhausted { needed: usize, remaining: usize },
    #[error("encoded length {length} exceeds the remaining {remaining} bytes")]
    LengthOverrun { length: u64, remaining: usize },
}
