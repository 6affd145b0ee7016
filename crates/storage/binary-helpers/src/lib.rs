//! Low level binary codec helpers shared by the storage crates.
//!
//! Everything on disk is little-endian. The helpers come in two layers:
//! offset-addressed reads/writes over a byte slice (`le`), and a pair of
//! positional cursors (`cursor`) used by the page and log codecs to walk a
//! serialized object field by field while keeping track of the bytes
//! consumed so far. The consumed span is what the checksum covers.

pub mod bin_error;
pub mod checksum;
pub mod cursor;
pub mod le;
