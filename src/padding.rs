//! PKCS#7 padding.

use crate::error::{Error, Result};

/// Pad `data` out to exactly `target_len` bytes, each added byte holding the
/// number of bytes added. Already-long-enough data is returned unchanged;
/// `target_len` below the data length is an error.
pub fn pad_pkcs7(data: &[u8], target_len: usize) -> Result<Vec<u8>> {
    let Some(pad_len) = target_len.checked_sub(data.len()) else {
        return Err(Error::InvalidArgument(format!(
            "target length {target_len} is shorter than data length {}",
            data.len()
        )));
    };
    let mut padded = data.to_vec();
    #[allow(clippy::cast_possible_truncation)]
    padded.resize(target_len, pad_len as u8);
    Ok(padded)
}

/// Pad `data` up to the next multiple of `block_size`.
///
/// When the data is already aligned, a full extra block of padding is
/// appended: PKCS#7 padding is never zero-length, which is what makes it
/// unambiguously removable.
pub fn pad_to_block_multiple(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if block_size == 0 {
        return Err(Error::InvalidArgument(
            "block size must be nonzero".to_string(),
        ));
    }
    let pad_len = block_size - data.len() % block_size;
    pad_pkcs7(data, data.len() + pad_len)
}

/// Strip PKCS#7 padding if, and only if, it is present.
///
/// The last byte `n` is taken as the padding length; the trailing `n` bytes
/// are stripped when `1 <= n <= block_size` and they all equal `n`.
/// Anything else is returned unchanged. This is deliberately lenient, so a
/// trailing byte that happens to match the pattern is indistinguishable from
/// real padding. Known imprecision, kept for parity with the paired
/// [`pad_to_block_multiple`] which never emits ambiguous padding.
pub fn unpad_pkcs7(data: &[u8], block_size: usize) -> Vec<u8> {
    let Some(&last) = data.last() else {
        return Vec::new();
    };
    let pad_len = last as usize;
    if pad_len >= 1
        && pad_len <= block_size
        && pad_len <= data.len()
        && data[data.len() - pad_len..].iter().all(|&b| b == last)
    {
        data[..data.len() - pad_len].to_vec()
    } else {
        data.to_vec()
    }
}
