//! XOR ciphers and frequency-based single-byte key recovery.

use crate::codec::bytes_to_str;
use crate::error::{Error, Result};

/// English letter frequencies including space, from
/// <http://www.macfreek.nl/memory/Letter_Distribution>. Chosen over the usual
/// 26-letter tables because the space frequency dominates real prose and
/// sharpens the score considerably.
const LETTER_FREQ: [(char, f64); 27] = [
    (' ', 0.183_168_575_3),
    ('e', 0.102_666_503_7),
    ('t', 0.075_169_982_7),
    ('a', 0.065_321_670_2),
    ('o', 0.061_595_772_5),
    ('n', 0.057_120_111_3),
    ('i', 0.056_684_432_6),
    ('s', 0.053_170_053_4),
    ('r', 0.049_879_085_5),
    ('h', 0.049_785_639_6),
    ('l', 0.033_175_479_6),
    ('d', 0.032_829_231_0),
    ('u', 0.022_757_953_6),
    ('c', 0.022_336_759_6),
    ('m', 0.020_265_678_3),
    ('f', 0.019_830_671_6),
    ('w', 0.017_038_937_7),
    ('g', 0.016_249_044_1),
    ('p', 0.015_043_242_8),
    ('y', 0.014_276_666_2),
    ('b', 0.012_588_807_4),
    ('v', 0.007_961_164_4),
    ('k', 0.005_609_627_2),
    ('x', 0.001_409_201_6),
    ('j', 0.000_975_218_1),
    ('q', 0.000_836_755_0),
    ('z', 0.000_512_846_9),
];

/// A ranked single-byte-XOR guess. Lower `score` means more English-like.
#[derive(Debug, Clone, PartialEq)]
pub struct XorCandidate {
    pub key: u8,
    pub plaintext: String,
    pub score: f64,
}

/// Element-wise XOR of two sequences, truncated to the shorter length.
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Repeat `key` to exactly `len` bytes (full repetitions, then a truncated
/// remainder).
pub fn cycle_key(key: &[u8], len: usize) -> Result<Vec<u8>> {
    if key.is_empty() {
        return Err(Error::InvalidArgument(
            "cannot cycle an empty key".to_string(),
        ));
    }
    Ok(key.iter().copied().cycle().take(len).collect())
}

/// XOR `plaintext` against `key` repeated to the plaintext's length.
pub fn encrypt_xor(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    Ok(xor(plaintext, &cycle_key(key, plaintext.len())?))
}

/// Inverse of [`encrypt_xor`]. XOR is an involution, so this is the same
/// operation under a different name.
pub fn decrypt_xor(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    encrypt_xor(ciphertext, key)
}

/// Score how English-like `text` is: the sum over the 27 table symbols of the
/// absolute difference between expected and observed frequency. Lower is
/// better. Empty text scores infinity so it ranks below any real candidate.
pub fn frequency_score(text: &str) -> f64 {
    if text.is_empty() {
        return f64::INFINITY;
    }
    let text = text.to_lowercase();
    #[allow(clippy::cast_precision_loss)]
    let len = text.chars().count() as f64;
    LETTER_FREQ
        .iter()
        .map(|&(symbol, expected)| {
            #[allow(clippy::cast_precision_loss)]
            let observed = text.chars().filter(|&c| c == symbol).count() as f64 / len;
            (expected - observed).abs()
        })
        .sum()
}

/// Drop every character that is not printable ASCII (space through tilde).
pub fn strip_non_printable(text: &str) -> String {
    text.chars()
        .filter(|&c| c == ' ' || c.is_ascii_graphic())
        .collect()
}

/// Try all 256 single-byte keys against `ciphertext` and return the `top_n`
/// most English-like decryptions, best first.
///
/// Decryptions that are empty after stripping non-printable characters are
/// dropped entirely rather than scored.
pub fn brute_force_single_byte_xor(ciphertext: &[u8], top_n: usize) -> Vec<XorCandidate> {
    let mut candidates = (0..=255u8)
        .filter_map(|key| {
            let decrypted = decrypt_xor(ciphertext, &[key]).ok()?;
            let plaintext = strip_non_printable(&bytes_to_str(&decrypted));
            if plaintext.is_empty() {
                return None;
            }
            let score = frequency_score(&plaintext);
            Some(XorCandidate {
                key,
                plaintext,
                score,
            })
        })
        .collect::<Vec<_>>();

    candidates.sort_by(|a, b| a.score.total_cmp(&b.score));
    candidates.truncate(top_n);
    candidates
}
