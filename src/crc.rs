//! CRC32 over byte buffers.
//!
//! The container uses CRC32 both as a general integrity tag and as the
//! identity key for patch matching (a patch entry's tag is the CRC32 of
//! the file it replaces).  The function is the standard reflected-
//! polynomial (0xEDB88320) CRC32: remainder starts at all-ones, each
//! byte indexes the precomputed table, final complement.  crc32fast
//! carries the table and picks a hardware path when one exists.

/// Hash a buffer.  Empty input returns 0.
///
/// The empty-input short-circuit mirrors the reference tool, which
/// treats an absent buffer and an empty one the same way.
pub fn hash(input: &[u8]) -> u32 {
    if input.is_empty() {
        return 0;
    }
    crc32fast::hash(input)
}
