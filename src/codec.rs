//! Conversions between strings, hex strings, and byte sequences.
//!
//! Strings are treated as one byte per character code point (latin-1 style),
//! so `bytes_to_str` and `str_to_bytes` invert each other exactly.

use crate::error::{Error, Result};

/// Convert a string to bytes, one byte per character code point.
///
/// Code points above U+00FF do not fit in a byte and are a format error.
pub fn str_to_bytes(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| Error::Format(format!("code point {c:?} does not fit in a byte")))
        })
        .collect()
}

/// Convert bytes to a string, one character per byte value.
pub fn bytes_to_str(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Hex-encode bytes as lowercase, two digits per byte.
pub fn hex_encode<B: AsRef<[u8]>>(data: B) -> String {
    data.as_ref()
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0b0000_1111])
        .map(|nibble| {
            if nibble < 10 {
                char::from(b'0' + nibble)
            } else {
                char::from(b'a' + nibble - 10)
            }
        })
        .collect()
}

fn map_to_nibble(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::Format(format!("invalid hex digit: {:?}", char::from(c)))),
    }
}

/// Decode a hex string (case-insensitive) into bytes.
///
/// Fails on odd-length input or any non-hex digit.
pub fn hex_decode<B: AsRef<[u8]>>(data: B) -> Result<Vec<u8>> {
    let data = data.as_ref();
    if data.len() % 2 != 0 {
        return Err(Error::Format(format!(
            "hex input has odd length {}",
            data.len()
        )));
    }
    data.chunks_exact(2)
        .map(|pair| Ok(map_to_nibble(pair[0])? << 4 | map_to_nibble(pair[1])?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_bytes() {
        assert_eq!(str_to_bytes("ABC").unwrap(), vec![65, 66, 67]);
    }

    #[test]
    fn test_str_to_bytes_wide_char() {
        assert!(str_to_bytes("snowman ☃").is_err());
    }

    #[test]
    fn test_bytes_to_str() {
        assert_eq!(bytes_to_str(&[65, 66, 67]), "ABC");
    }

    #[test]
    fn test_hex_encode_lowercase() {
        assert_eq!(hex_encode([255, 1, 10]), "ff010a");
    }

    #[test]
    fn test_hex_decode_case_insensitive() {
        assert_eq!(hex_decode("FF010A").unwrap(), vec![255, 1, 10]);
        assert_eq!(hex_decode("ff010a").unwrap(), vec![255, 1, 10]);
    }

    #[test]
    fn test_hex_decode_odd_length() {
        assert!(hex_decode("abc").is_err());
    }

    #[test]
    fn test_hex_decode_bad_digit() {
        assert!(hex_decode("zz").is_err());
    }
}
