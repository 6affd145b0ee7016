//! Positional cursors over byte slices.
//!
//! Object codecs in the page and wal crates serialize fields sequentially.
//! The cursors keep the running position so callers never compute offsets
//! by hand, and expose the span consumed/produced so far, which is the
//! input to the trailing checksum of each object.

use crate::bin_error::BinaryError;
use crate::le::{LittleEndianInteger, read_le, write_le};

/// Sequential reader over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// The span of bytes consumed so far. Checksums are computed over this.
    pub fn consumed(&self) -> &'a [u8] {
        &self.bytes[..self.position]
    }

    /// The span consumed since `start`. Used when an object is decoded
    /// mid-stream and its checksum covers only its own bytes.
    pub fn span_since(&self, start: usize) -> &'a [u8] {
        &self.bytes[start..self.position]
    }

    /// Reads the next little-endian integer and advances.
    pub fn read<T: LittleEndianInteger>(&mut self) -> Result<T, BinaryError> {
        let value = read_le::<T>(self.bytes, self.position)?;
        self.position += T::SIZE;
        Ok(value)
    }

    /// Reads the next `count` raw bytes and advances.
    pub fn read_exact(&mut self, count: usize) -> Result<&'a [u8], BinaryError> {
        let Some(slice) = self.bytes.get(self.position..self.position + count) else {
            return Err(BinaryError::Exhausted {
                needed: count,
                remaining: self.remaining(),
            });
        };
        self.position += count;
        Ok(slice)
    }

    /// Reads a u64 length prefix followed by that many payload bytes.
    pub fn read_buffer(&mut self) -> Result<&'a [u8], BinaryError> {
        let length = self.read::<u64>()?;
        if length > self.remaining() as u64 {
            return Err(BinaryError::LengthOverrun {
                length,
                remaining: self.remaining(),
            });
        }
        self.read_exact(length as usize)
    }
}

/// Sequential writer over a mutable byte slice.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of bytes produced so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The span of bytes produced so far. Checksums are computed over this.
    pub fn written(&self) -> &[u8] {
        &self.bytes[..self.position]
    }

    /// The span produced since `start`.
    pub fn span_since(&self, start: usize) -> &[u8] {
        &self.bytes[start..self.position]
    }

    /// Writes a little-endian integer and advances.
    pub fn write<T: LittleEndianInteger>(&mut self, value: T) -> Result<(), BinaryError> {
        write_le::<T>(self.bytes, self.position, value)?;
        self.position += T::SIZE;
        Ok(())
    }

    /// Writes raw bytes and advances.
    pub fn write_bytes(&mut self, source: &[u8]) -> Result<(), BinaryError> {
        let Some(slice) = self.bytes.get_mut(self.position..self.position + source.len()) else {
            return Err(BinaryError::Exhausted {
                needed: source.len(),
                remaining: self.bytes.len() - self.position,
            });
        };
        slice.copy_from_slice(source);
        self.position += source.len();
        Ok(())
    }

    /// Writes a u64 length prefix followed by the payload bytes.
    pub fn write_buffer(&mut self, source: &[u8]) -> Result<(), BinaryError> {
        self.write::<u64>(source.len() as u64)?;
        self.write_bytes(source)
    }

    /// Zero-fills the next `count` bytes and advances.
    pub fn fill_zero(&mut self, count: usize) -> Result<(), BinaryError> {
        let Some(slice) = self.bytes.get_mut(self.position..self.position + count) else {
            return Err(BinaryError::Exhausted {
                needed: count,
                remaining: self.bytes.len() - self.position,
            });
        };
        slice.fill(0);
        self.position += count;
        Ok(())
    }
}

#[cfg(test)]
mod cursor_tests {
    use super::*;

    #[test]
    fn reader_walks_fields_sequentially() {
        let mut bytes = vec![0u8; 20];
        bytes[0] = 7;
        bytes[8] = 9;
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read::<u64>().unwrap(), 7);
        assert_eq!(reader.read::<u64>().unwrap(), 9);
        assert_eq!(reader.position(), 16);
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn reader_buffer_round_trip() {
        let mut bytes = vec![0u8; 32];
        {
            let mut writer = ByteWriter::new(&mut bytes);
            writer.write_buffer(b"hello").unwrap();
        }
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_buffer().unwrap(), b"hello");
        assert_eq!(reader.position(), 13);
    }

    #[test]
    fn reader_rejects_length_prefix_past_end() {
        let mut bytes = vec![0u8; 12];
        bytes[0] = 0xFF; // length prefix of 255 with only 4 payload bytes
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_buffer(),
            Err(BinaryError::LengthOverrun { length: 255, .. })
        ));
    }

    #[test]
    fn writer_exhaustion_is_an_error() {
        let mut bytes = vec![0u8; 4];
        let mut writer = ByteWriter::new(&mut bytes);
        assert!(writer.write::<u64>(1).is_err());
    }

    #[test]
    fn consumed_and_written_track_the_same_span() {
        let mut bytes = vec![0u8; 16];
        {
            let mut writer = ByteWriter::new(&mut bytes);
            writer.write::<u64>(99).unwrap();
            assert_eq!(writer.written().len(), 8);
        }
        let mut reader = ByteReader::new(&bytes);
        reader.read::<u64>().unwrap();
        assert_eq!(reader.consumed().len(), 8);
    }
}
