//! The storage file header.

use crate::errors::StorageError;
use binary_helpers::le::{read_le, write_le};

/// Size of the file header region. Pages start right after it.
pub const FILE_HEADER_SIZE: usize = 8;

/// The header fixes the page size of the file; everything after it is
/// page-size aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub page_size: usize,
}

impl FileHeader {
    pub fn load(bytes: &[u8]) -> Result<Self, StorageError> {
        let page_size = read_le::<u64>(bytes, 0).map_err(StorageError::HeaderParse)?;
        Ok(Self {
            page_size: page_size as usize,
        })
    }

    pub fn dump(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut bytes = [0u8; FILE_HEADER_SIZE];
        // Writing a u64 into an 8 byte buffer cannot fail.
        write_le::<u64>(&mut bytes, 0, self.page_size as u64)
            .expect("file header buffer has a fixed size");
        bytes
    }
}
