//! Binary codec for journal entries.
//!
//! Entries are serialized with:
//! - JSON payloads (compatible with the records' serde attributes)
//! - Length-prefixed framing
//! - CRC32 checksum for corruption detection
//! - Version byte for forward compatibility

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Serialize};

/// Current codec version.
const CODEC_VERSION: u8 = 1;

/// Magic bytes identifying cardfile journal files.
pub const MAGIC: [u8; 4] = *b"CARD";

/// Records are flat scalar structs; anything near this size is corrupt.
const MAX_ENTRY_SIZE: usize = 16 * 1024 * 1024;

/// Serializes a value to framed bytes with checksum.
///
/// Format:
/// ```text
/// [version: 1 byte][length: 4 bytes LE][payload: N bytes JSON][crc32: 4 bytes LE]
/// ```
pub fn encode<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let payload = serde_json::to_vec(value).map_err(|e| {
        IoError::new(ErrorKind::InvalidData, format!("serialization failed: {e}"))
    })?;

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u32;

    let mut out = Vec::with_capacity(1 + 4 + payload.len() + 4);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc.to_le_bytes());

    Ok(out)
}

/// Deserializes the next framed value from the reader, verifying checksum.
///
/// # Errors
/// - `ErrorKind::UnexpectedEof` if the frame is truncated
/// - `ErrorKind::InvalidData` on version mismatch, oversized frames, CRC
///   failure, or payload deserialization failure
pub fn decode<T: DeserializeOwned>(reader: &mut impl Read) -> IoResult<T> {
    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;

    if version[0] != CODEC_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!(
                "unsupported codec version: {} (expected {CODEC_VERSION})",
                version[0]
            ),
        ));
    }

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_ENTRY_SIZE {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("entry size {len} exceeds maximum {MAX_ENTRY_SIZE}"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let stored_crc = u32::from_le_bytes(crc_bytes);

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let computed_crc = hasher.finalize();

    if stored_crc != computed_crc {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("CRC mismatch: stored={stored_crc:08x}, computed={computed_crc:08x}"),
        ));
    }

    serde_json::from_slice(&payload).map_err(|e| {
        IoError::new(
            ErrorKind::InvalidData,
            format!("deserialization failed: {e}"),
        )
    })
}

/// Writes the journal file header (magic + version).
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[CODEC_VERSION])?;
    Ok(())
}

/// Size of the journal file header in bytes.
pub const HEADER_LEN: u64 = MAGIC.len() as u64 + 1;

/// Reads and validates the journal file header, returning the version byte.
pub fn read_header(reader: &mut impl Read) -> IoResult<u8> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;

    if magic != MAGIC {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid magic bytes: expected {MAGIC:?}, got {magic:?}"),
        ));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;

    Ok(version[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_simple() {
        let value = "one small record".to_string();
        let encoded = encode(&value).unwrap();

        let mut cursor = Cursor::new(encoded);
        let decoded: String = decode(&mut cursor).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn test_detects_corruption() {
        let value = "payload".to_string();
        let mut encoded = encode(&value).unwrap();

        // Flip a bit inside the payload section
        encoded[7] ^= 0xFF;

        let mut cursor = Cursor::new(encoded);
        let result: IoResult<String> = decode(&mut cursor);

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_rejects_oversized_entry() {
        let mut bad = vec![1u8]; // codec version
        bad.extend_from_slice(&(64_000_000u32).to_le_bytes());

        let mut cursor = Cursor::new(bad);
        let result: IoResult<String> = decode(&mut cursor);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_truncated_frame_is_unexpected_eof() {
        let encoded = encode(&"truncate me".to_string()).unwrap();
        let cut = encoded.len() - 3;

        let mut cursor = Cursor::new(&encoded[..cut]);
        let result: IoResult<String> = decode(&mut cursor);

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_header_roundtrip() {
        let mut buf = Vec::new();
        write_header(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, HEADER_LEN);

        let mut cursor = Cursor::new(buf);
        let version = read_header(&mut cursor).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = b"NOPE".to_vec();
        buf.push(1);

        let mut cursor = Cursor::new(buf);
        assert!(read_header(&mut cursor).is_err());
    }
}
