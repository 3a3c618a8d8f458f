//! Hamming distance and repeating-key-length estimation.

use crate::error::{Error, Result};

/// Sample chunks compared against the reference chunk when no explicit count
/// is given.
pub const DEFAULT_KEY_LENGTH_SAMPLES: usize = 2;

/// Number of differing bits between two bytes.
pub fn bit_distance(a: u8, b: u8) -> u32 {
    (a ^ b).count_ones()
}

/// Total differing bits over zipped pairs, truncated to the shorter sequence.
///
/// Symmetric, and zero exactly when the sequences agree over their compared
/// length.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| bit_distance(x, y))
        .sum()
}

/// Score `candidate_len` as a repeating-key length for `data`.
///
/// The first `candidate_len` bytes form a reference chunk; up to `samples`
/// complete chunks that follow are each compared against it, and the mean of
/// `hamming_distance / candidate_len` over the chunks actually taken is
/// returned. A low score suggests the data repeats with that period.
///
/// Fails if `candidate_len` is zero or `data` is too short to yield even one
/// comparison chunk.
pub fn estimate_key_length(candidate_len: usize, data: &[u8], samples: usize) -> Result<f64> {
    if candidate_len == 0 {
        return Err(Error::InvalidArgument(
            "candidate key length must be nonzero".to_string(),
        ));
    }
    let reference = data
        .get(..candidate_len)
        .ok_or_else(|| Error::InvalidArgument(format!(
            "data ({} bytes) is shorter than candidate length {candidate_len}",
            data.len()
        )))?;

    let distances = data[candidate_len..]
        .chunks_exact(candidate_len)
        .take(samples)
        .map(|chunk| f64::from(hamming_distance(reference, chunk)) / candidate_len as f64)
        .collect::<Vec<_>>();

    if distances.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "data ({} bytes) has no complete {candidate_len}-byte chunk to compare against",
            data.len()
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    Ok(mean)
}

/// Scan `range` and return the candidate length with the lowest normalized
/// distance, the likely repeating-key length. Candidates the data is too
/// short to score are skipped; fails if none can be scored.
pub fn best_key_length(
    range: impl IntoIterator<Item = usize>,
    data: &[u8],
    samples: usize,
) -> Result<usize> {
    range
        .into_iter()
        .filter_map(|len| {
            estimate_key_length(len, data, samples)
                .ok()
                .map(|score| (len, score))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(len, _)| len)
        .ok_or_else(|| {
            Error::InvalidArgument("no candidate key length could be scored".to_string())
        })
}
