//! Byte-order-aware stream primitives.
//!
//! [`IpkStream`] wraps any `Read`/`Write`/`Seek` stream and provides the
//! fixed-width integer, length-prefixed string and alignment operations
//! the container codec is written against.  A single [`Endian`] flag
//! chosen at construction applies to every multi-byte integer; strings
//! and raw byte runs are never swapped.
//!
//! This module is pure mechanism: it makes no framing or validation
//! decisions, and all errors are plain `io::Error`s.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Byte order applied to all multi-byte integer fields of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

pub struct IpkStream<S> {
    inner: S,
    endian: Endian,
}

impl<S> IpkStream<S> {
    pub fn new(inner: S, endian: Endian) -> Self {
        Self { inner, endian }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

// ── Reads ────────────────────────────────────────────────────────────────────

impl<S: Read> IpkStream<S> {
    pub fn read_u32(&mut self) -> io::Result<u32> {
        match self.endian {
            Endian::Little => self.inner.read_u32::<LittleEndian>(),
            Endian::Big => self.inner.read_u32::<BigEndian>(),
        }
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        match self.endian {
            Endian::Little => self.inner.read_i32::<LittleEndian>(),
            Endian::Big => self.inner.read_i32::<BigEndian>(),
        }
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        match self.endian {
            Endian::Little => self.inner.read_u64::<LittleEndian>(),
            Endian::Big => self.inner.read_u64::<BigEndian>(),
        }
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        match self.endian {
            Endian::Little => self.inner.read_i64::<LittleEndian>(),
            Endian::Big => self.inner.read_i64::<BigEndian>(),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a 32-bit length then that many bytes, decoded as UTF-8.
    pub fn read_pstring(&mut self) -> io::Result<String> {
        let len = self.read_u32()?;
        let buf = self.read_bytes(len as usize)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

// ── Writes ───────────────────────────────────────────────────────────────────

impl<S: Write> IpkStream<S> {
    pub fn write_u32(&mut self, v: u32) -> io::Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_u32::<LittleEndian>(v),
            Endian::Big => self.inner.write_u32::<BigEndian>(v),
        }
    }

    pub fn write_i32(&mut self, v: i32) -> io::Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_i32::<LittleEndian>(v),
            Endian::Big => self.inner.write_i32::<BigEndian>(v),
        }
    }

    pub fn write_u64(&mut self, v: u64) -> io::Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_u64::<LittleEndian>(v),
            Endian::Big => self.inner.write_u64::<BigEndian>(v),
        }
    }

    pub fn write_i64(&mut self, v: i64) -> io::Result<()> {
        match self.endian {
            Endian::Little => self.inner.write_i64::<LittleEndian>(v),
            Endian::Big => self.inner.write_i64::<BigEndian>(v),
        }
    }

    pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        if !buf.is_empty() {
            self.inner.write_all(buf)?;
        }
        Ok(())
    }

    /// Write a 32-bit length then the UTF-8 bytes of `v`.
    pub fn write_pstring(&mut self, v: &str) -> io::Result<()> {
        self.write_u32(v.len() as u32)?;
        self.write_bytes(v.as_bytes())
    }
}

// ── Cursor movement ──────────────────────────────────────────────────────────

impl<S: Seek> IpkStream<S> {
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Start(pos))
    }

    pub fn skip(&mut self, delta: i64) -> io::Result<u64> {
        self.inner.seek(SeekFrom::Current(delta))
    }
}

impl<S: Write + Seek> IpkStream<S> {
    /// Write `fill` bytes until the stream position is a multiple of `align`.
    /// `align` must be a power of two.
    pub fn pad_to_alignment(&mut self, align: u64, fill: u8) -> io::Result<()> {
        debug_assert!(align.is_power_of_two());
        let pad = [fill];
        while self.position()? & (align - 1) != 0 {
            self.inner.write_all(&pad)?;
        }
        Ok(())
    }
}
