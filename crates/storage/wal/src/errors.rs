use binary_helpers::bin_error::BinaryError;
use buffer::BufferError;
use page::errors::page_error::PageError;
use thiserror::Error;

/// Failure while decoding or encoding a log record.
#[derive(Debug, Error)]
pub enum LogRecordParseError {
    #[error("log record byte image too small: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("unknown log record kind tag {0}")]
    UnknownKind(u8),
    #[error("error while interpreting binary data")]
    Binary(#[from] BinaryError),
    #[error("failed to parse embedded page slot")]
    Slot(#[from] PageError),
}

/// A log record's stored checksum did not match the recomputed one.
#[derive(Debug, Error)]
#[error("log record corrupt: stored checksum {stored:#010x}, computed {computed:#010x}")]
pub struct LogRecordCorruptError {
    pub stored: u32,
    pub computed: u32,
}

/// Errors surfaced by the log manager.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("failed to parse log record")]
    Parse(#[from] LogRecordParseError),
    #[error("log record corrupt")]
    Corrupt(#[from] LogRecordCorruptError),
    #[error("log buffer error")]
    Buffer(#[from] BufferError),
    #[error("log page error")]
    Page(#[from] PageError),
}
