//! Decompression of embedded descriptor payloads.
//!
//! Generated code may embed descriptor bytes gzip compressed to keep binaries small. The
//! payload is recognised by the gzip magic and inflated with `flate2` before any decoding
//! happens; uncompressed payloads are passed through untouched.
//!
//! # GZip Format
//!
//! ```text
//! [0..2]  : magic 0x1f 0x8b
//! [2]     : compression method (8 = deflate)
//! [3..10] : flags, mtime, extra flags, OS
//! [10..]  : deflate stream, followed by CRC32 and ISIZE
//! ```

use std::{borrow::Cow, io::Read};

use flate2::read::GzDecoder;

use crate::Result;

/// The two byte gzip magic prefix.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Checks if the given data starts with the gzip magic.
///
/// # Arguments
///
/// * `data` - The potentially compressed data.
#[must_use]
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Decompresses GZip data using flate2.
///
/// # Arguments
///
/// * `data` - The GZip compressed data.
///
/// # Returns
///
/// The decompressed data.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the stream is corrupt or truncated.
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| malformed_error!("GZip decompression error: {}", e))?;

    Ok(decompressed)
}

/// Returns the canonical (uncompressed) form of a descriptor payload.
///
/// Compressed input is inflated, anything else is borrowed as is.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the payload carries the gzip magic but fails to
/// inflate.
pub fn inflate(data: &[u8]) -> Result<Cow<'_, [u8]>> {
    if is_gzip(data) {
        Ok(Cow::Owned(decompress_gzip(data)?))
    } else {
        Ok(Cow::Borrowed(data))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};

    use super::*;

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x0a, 0x05]));
        assert!(!is_gzip(&[0x1f]));
    }

    #[test]
    fn test_decompress_gzip() {
        let original = b"\x0a\x0bhello.proto\x12\x05hello";

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        let decompressed = decompress_gzip(&compressed).unwrap();
        assert_eq!(&decompressed, original);

        assert!(matches!(inflate(&compressed).unwrap(), Cow::Owned(_)));
        assert!(matches!(inflate(original).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_decompress_gzip_truncated() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0x42; 512]).unwrap();
        let compressed = encoder.finish().unwrap();

        let truncated = &compressed[..compressed.len() / 2];
        assert!(matches!(
            inflate(truncated),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
