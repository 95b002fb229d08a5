//! Single-byte compact length codec
//!
//! Compact arrays and strings store `actual_length + 1`, so a stored `0`
//! means null. This subset only ever uses one byte for the stored value,
//! which caps the actual length at 254.

use crate::error::{ProtocolError, Result};

/// Largest actual length that fits in one stored byte
pub const MAX_COMPACT_LEN: usize = u8::MAX as usize - 1;

/// Decodes a stored compact length
///
/// # Returns
/// * `None` - The stored value was 0 (null)
/// * `Some(len)` - The actual length
pub fn decode_compact_len(stored: u8) -> Option<usize> {
    (stored as usize).checked_sub(1)
}

/// Encodes an actual length as its stored compact form
///
/// # Returns
/// * `Ok(u8)` - `len + 1`
/// * `Err(ProtocolError::Encoding)` - If `len` exceeds [`MAX_COMPACT_LEN`]
pub fn encode_compact_len(len: usize) -> Result<u8> {
    if len > MAX_COMPACT_LEN {
        return Err(ProtocolError::Encoding(format!(
            "compact length {} exceeds single-byte maximum {}",
            len, MAX_COMPACT_LEN
        )));
    }
    Ok(len as u8 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_null() {
        assert_eq!(decode_compact_len(0), None);
    }

    #[test]
    fn test_decode_lengths() {
        assert_eq!(decode_compact_len(1), Some(0));
        assert_eq!(decode_compact_len(2), Some(1));
        assert_eq!(decode_compact_len(4), Some(3));
        assert_eq!(decode_compact_len(255), Some(254));
    }

    #[test]
    fn test_encode_lengths() {
        assert_eq!(encode_compact_len(0).unwrap(), 1);
        assert_eq!(encode_compact_len(1).unwrap(), 2);
        assert_eq!(encode_compact_len("foo".len()).unwrap(), 4);
        assert_eq!(encode_compact_len(MAX_COMPACT_LEN).unwrap(), 255);
    }

    #[test]
    fn test_encode_too_long() {
        let err = encode_compact_len(MAX_COMPACT_LEN + 1).unwrap_err();
        assert!(matches!(err, ProtocolError::Encoding(_)));
    }
}
