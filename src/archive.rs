//! The IPK container: in-memory model plus the binary codec.
//!
//! # Layout
//! A fixed header (magic, version pair, base offset, entry count, 28
//! opaque bytes), then one table record per entry, then the 4-byte-
//! aligned file-data region.  Every per-entry offset is relative to the
//! base offset, never absolute.
//!
//! # Writer
//! [`IpkArchive::write_to`] is a two-pass encoder: entry offsets are not
//! known until every preceding entry (post-compression size and padding
//! included) has been emitted, so the table is written with placeholder
//! offset fields whose positions are remembered and backpatched while
//! the data region is written.  The base-offset field itself is the
//! first such hole.
//!
//! # Reader
//! [`IpkArchive::read_from`] validates the header, then walks the table,
//! temporarily seeking into the data region for each entry's bytes.  A
//! failed read returns nothing — callers never observe a partially
//! populated archive.
//!
//! Field values match the latest Switch build of the shipping game;
//! other targets may differ in endianness, which is why the byte order
//! is a parameter rather than a constant.

use log::debug;
use std::io::{Read, Seek, Write};

use crate::codec;
use crate::error::IpkError;
use crate::io_stream::{Endian, IpkStream};

pub const MAGIC: u32 = 0x50EC12BA;
pub const VERSION: i32 = 5;
pub const VERSION2: i32 = 11;
pub const HEADER_BLOB_LEN: usize = 28;

/// "PATCHIPKHEADER1111111111111\0".  An archive whose header blob equals
/// this is a patch archive; there is no other structural difference.
/// The trailing NUL could serve as a patch format version some day.
pub const PATCH_SENTINEL: [u8; HEADER_BLOB_LEN] = *b"PATCHIPKHEADER1111111111111\0";

/// Suffix of the per-file and archive-wide metadata sidecars written by
/// the directory exporter.  Paths ending in it are never archive entries.
pub const SIDECAR_SUFFIX: &str = ".nik";
/// Name of the archive-wide sidecar holding the raw header blob.
pub const META_SIDECAR: &str = "meta.nik";

/// Marker of cooked (engine-compiled) content in a path.
pub const COOKED_MARKER: &str = ".ckd";
pub const TYPE_PLAIN: u32 = 0;
pub const TYPE_COOKED: u32 = 2;

/// Paths that get a zlib pass on encode.  Textures and dance tapes
/// compress well; everything else ships verbatim.
const ZLIB_SUFFIXES: [&str; 4] = [".png.ckd", ".tga.ckd", ".m3d.ckd", ".dtape.ckd"];

const ENTRY_VERSION: u32 = 1;
const ALIGN: u64 = 4;

/// One logical file inside an archive.
///
/// `tag` is the original per-file identifier in a plain archive, or the
/// CRC32 of the replaced file's contents in a patch archive.  The
/// archive kind decides the meaning; the field itself is a plain u32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpkEntry {
    /// Archive-relative, forward-slash separated.
    pub path: String,
    pub contents: Vec<u8>,
    pub tag: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpkArchive {
    /// Opaque 28-byte metadata block, copied verbatim on read and write.
    pub header_blob: [u8; HEADER_BLOB_LEN],
    /// Insertion order is preserved through read/write round trips.
    pub entries: Vec<IpkEntry>,
}

impl Default for IpkArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl IpkArchive {
    pub fn new() -> Self {
        Self {
            header_blob: [0u8; HEADER_BLOB_LEN],
            entries: Vec::new(),
        }
    }

    /// True iff the header blob equals the patch sentinel.
    pub fn is_patch(&self) -> bool {
        self.header_blob == PATCH_SENTINEL
    }

    pub fn entry(&self, path: &str) -> Option<&IpkEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    // ── Decode ───────────────────────────────────────────────────────────────

    /// Decode an archive from a stream in the shipping game's byte order.
    pub fn read_from<S: Read + Seek>(stream: S) -> Result<Self, IpkError> {
        Self::read_from_endian(stream, Endian::Big)
    }

    pub fn read_from_endian<S: Read + Seek>(stream: S, endian: Endian) -> Result<Self, IpkError> {
        let mut reader = IpkStream::new(stream, endian);

        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(IpkError::BadMagic {
                expected: MAGIC,
                actual: magic,
            });
        }
        let version = reader.read_i32()?;
        if version != VERSION {
            return Err(IpkError::BadVersion {
                expected: VERSION,
                actual: version,
            });
        }
        let version2 = reader.read_i32()?;
        if version2 != VERSION2 {
            return Err(IpkError::BadVersion2 {
                expected: VERSION2,
                actual: version2,
            });
        }

        let base_offset = reader.read_u32()?;
        let count = reader.read_i32()?;

        let mut header_blob = [0u8; HEADER_BLOB_LEN];
        header_blob.copy_from_slice(&reader.read_bytes(HEADER_BLOB_LEN)?);

        let mut entries = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let entry_version = reader.read_u32()?;
            if entry_version != ENTRY_VERSION {
                return Err(IpkError::BadEntryVersion(entry_version));
            }
            let raw_size = reader.read_u32()?;
            let packed_size = reader.read_u32()?;
            let compressed = packed_size > 0;
            let timestamp = reader.read_i64()?;
            let offset = reader.read_u64()?;
            let s1 = reader.read_pstring()?;
            let s2 = reader.read_pstring()?;
            let tag = reader.read_u32()?;
            let type_code = reader.read_u32()?;

            // Tool versions of the producer swapped which string carries
            // the filename.  Directory paths never contain dots in this
            // game's data set; filenames always do.
            let path = if s2.contains('.') {
                format!("{s1}{s2}")
            } else {
                format!("{s2}{s1}")
            };
            if path.is_empty() {
                return Err(IpkError::EmptyEntryPath);
            }

            let cooked = path.contains(COOKED_MARKER);
            if (cooked && type_code != TYPE_COOKED) || (!cooked && type_code != TYPE_PLAIN) {
                return Err(IpkError::BadTypeCode { path, code: type_code });
            }

            let table_pos = reader.position()?;
            reader.seek_to(u64::from(base_offset) + offset)?;
            let stored_len = if compressed { packed_size } else { raw_size };
            let stored = reader.read_bytes(stored_len as usize)?;
            reader.seek_to(table_pos)?;

            let contents = if compressed {
                let unpacked = codec::decompress(&stored)?;
                if unpacked.len() != raw_size as usize {
                    return Err(IpkError::SizeMismatch {
                        path,
                        expected: raw_size,
                        actual: unpacked.len(),
                    });
                }
                unpacked
            } else {
                stored
            };

            debug!("{path} = {raw_size} bytes, zlib = {compressed}, filetime = {timestamp}");
            entries.push(IpkEntry { path, contents, tag });
        }

        Ok(Self { header_blob, entries })
    }

    // ── Encode ───────────────────────────────────────────────────────────────

    /// Encode the archive in the shipping game's byte order.
    pub fn write_to<S: Write + Seek>(&self, stream: S) -> Result<(), IpkError> {
        self.write_to_endian(stream, Endian::Big)
    }

    /// Two-pass encode: header and table with offset holes first, data
    /// region second, backpatching each hole as its entry's bytes land.
    ///
    /// The write cursor is shared; callers must not interleave their own
    /// writes on the stream while this runs.
    pub fn write_to_endian<S: Write + Seek>(
        &self,
        stream: S,
        endian: Endian,
    ) -> Result<(), IpkError> {
        let mut writer = IpkStream::new(stream, endian);

        writer.write_u32(MAGIC)?;
        writer.write_i32(VERSION)?;
        writer.write_i32(VERSION2)?;
        let base_offset_hole = writer.position()?;
        writer.write_u32(0)?; // filled in once the table size is known
        writer.write_i32(self.entries.len() as i32)?;
        writer.write_bytes(&self.header_blob)?;

        // One wall-clock stamp shared by every entry of this encode pass.
        let stamp = filetime_now();

        let mut offset_holes: Vec<u64> = Vec::with_capacity(self.entries.len());
        let mut stored: Vec<Vec<u8>> = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let path = entry.path.as_str();
            if path.is_empty() {
                return Err(IpkError::EmptyEntryPath);
            }
            let cooked = path.ends_with(COOKED_MARKER);
            let use_zlib = ZLIB_SUFFIXES.iter().any(|s| path.ends_with(s));

            let (dir, name) = match path.rsplit_once('/') {
                Some((dir, name)) => (dir, name),
                None => ("", path),
            };
            let mut dirpath = dir.replace('\\', "/");
            if !dirpath.ends_with('/') {
                dirpath.push('/');
            }

            writer.write_u32(ENTRY_VERSION)?;
            // Always the raw size here; the stored size follows.
            writer.write_u32(entry.contents.len() as u32)?;

            let bytes = if use_zlib {
                codec::compress(&entry.contents)?
            } else {
                entry.contents.clone()
            };
            writer.write_u32(if use_zlib { bytes.len() as u32 } else { 0 })?;
            writer.write_i64(stamp)?;

            let hole = writer.position()?;
            writer.write_u64(0x1337)?; // offset hole, backpatched below
            writer.write_pstring(name)?;
            writer.write_pstring(&dirpath)?;
            writer.write_u32(entry.tag)?;
            writer.write_u32(if cooked { TYPE_COOKED } else { TYPE_PLAIN })?;

            debug!("Adding offset hole for {path} at {hole:#010X}");
            offset_holes.push(hole);
            stored.push(bytes);
        }

        // The data region starts 4-byte aligned; backpatch the base offset.
        writer.pad_to_alignment(ALIGN, 0)?;
        let base_offset = writer.position()?;
        writer.seek_to(base_offset_hole)?;
        writer.write_u32(base_offset as u32)?;
        writer.seek_to(base_offset)?;

        for (bytes, hole) in stored.iter().zip(&offset_holes) {
            let start = writer.position()?;
            writer.write_bytes(bytes)?;
            writer.pad_to_alignment(ALIGN, 0)?;
            let end = writer.position()?;

            writer.seek_to(*hole)?;
            writer.write_u64(start - base_offset)?;
            writer.seek_to(end)?;
            debug!("Written offset hole {start:#010X}");
        }

        Ok(())
    }
}

/// Current time as a Windows FILETIME: 100 ns ticks since 1601-01-01 UTC.
/// The on-disk timestamps use this epoch.
fn filetime_now() -> i64 {
    const UNIX_TO_FILETIME_SECS: i64 = 11_644_473_600;
    let now = chrono::Utc::now();
    (now.timestamp() + UNIX_TO_FILETIME_SECS) * 10_000_000
        + i64::from(now.timestamp_subsec_nanos() / 100)
}
