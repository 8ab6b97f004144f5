//! The one compression codec the container knows: zlib.
//!
//! Cooked texture and tape entries are stored as zlib streams at the
//! smallest-size setting; everything else is stored verbatim.  There is
//! no codec negotiation and no fallback — an entry either carries a
//! zlib stream or raw bytes, decided by its path suffix at encode time.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Compress `raw` into a zlib stream at maximum ratio.
pub fn compress(raw: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::best());
    enc.write_all(raw)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    enc.finish()
        .map_err(|e| CodecError::Compression(e.to_string()))
}

/// Decompress a zlib stream.
///
/// Truncated or corrupt input fails; partial output is never returned.
pub fn decompress(packed: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    ZlibDecoder::new(packed)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompression(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let raw = b"the same phrase over and over, the same phrase over and over";
        let packed = compress(raw).unwrap();
        assert!(packed.len() < raw.len());
        assert_eq!(decompress(&packed).unwrap(), raw);
    }

    #[test]
    fn empty_input_roundtrips() {
        let packed = compress(&[]).unwrap();
        assert_eq!(decompress(&packed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let packed = compress(b"some payload that will be cut short").unwrap();
        let truncated = &packed[..packed.len() / 2];
        assert!(matches!(
            decompress(truncated),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decompress(&[0x13, 0x37, 0x00, 0x01, 0x02]).is_err());
    }
}
