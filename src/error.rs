use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// Crate-wide error type.  Every failure is fatal to the operation that
/// raised it; nothing in this crate retries, and no partially-populated
/// archive is ever handed back to a caller.
#[derive(Error, Debug)]
pub enum IpkError {
    #[error("Invalid magic, expected 0x{expected:08X} got 0x{actual:08X}")]
    BadMagic { expected: u32, actual: u32 },
    #[error("Invalid version, expected {expected} got {actual}")]
    BadVersion { expected: i32, actual: i32 },
    #[error("Invalid version2, expected {expected} got {actual}")]
    BadVersion2 { expected: i32, actual: i32 },
    #[error("Entry format version is not 1, got {0}")]
    BadEntryVersion(u32),
    #[error("Invalid type code {code} for entry '{path}'")]
    BadTypeCode { path: String, code: u32 },
    #[error("Size mismatch between decompressed and expected: {actual} / {expected}, {path}")]
    SizeMismatch {
        path: String,
        expected: u32,
        actual: usize,
    },
    #[error("Entry has an empty path")]
    EmptyEntryPath,
    #[error("The patch archive header is not the patch sentinel")]
    NotAPatch,
    #[error(
        "Patch conflict on '{path}': entry tag {expected:08X} matches neither the current \
         CRC32 {actual:08X} nor the current contents. Wrong patch or wrong base archive."
    )]
    PatchConflict {
        path: String,
        expected: u32,
        actual: u32,
    },
    #[error("Archive directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("Missing or unreadable sidecar for {path}: {reason}")]
    BadSidecar { path: PathBuf, reason: String },
    #[error("meta.nik must hold exactly {expected} bytes, got {actual}")]
    BadHeaderBlob { expected: usize, actual: usize },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
