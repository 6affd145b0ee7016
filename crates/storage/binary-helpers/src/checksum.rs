//! Single-pass CRC32 over a serialized object's bytes.
//!
//! Every on-disk object (page headers, slots, log records, the free space
//! list) appends one checksum after its fields. The codec computes it over
//! the exact span produced by the writer, and the loader recomputes it over
//! the span consumed before the checksum field.

/// Computes the CRC32 of `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}
