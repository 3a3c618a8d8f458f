//! Probing an opaque encryption oracle.
//!
//! An oracle is any function from chosen plaintext to ciphertext. Nothing
//! here looks inside one: block size, prefix layout, and cipher mode are all
//! inferred from how the ciphertext's length and block structure react to
//! crafted inputs. Within one analysis the oracle is assumed to keep a fixed
//! key, mode, block size, and prefix/suffix.

use std::collections::HashSet;

use tracing::debug;

use crate::aes::{self, gen_random_bytes, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::padding::pad_to_block_multiple;

/// An opaque encrypt(plaintext) -> ciphertext capability.
///
/// Implemented for every `Fn(&[u8]) -> Vec<u8>` closure, so callers can hand
/// over a plain function and never build a type for it.
pub trait Oracle {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;
}

impl<F> Oracle for F
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        self(plaintext)
    }
}

/// The cipher mode an oracle was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Ecb,
    Cbc,
}

/// What [`detect_block_layout`] learns about an oracle.
///
/// `prefix_len` is the number of fixed bytes the oracle prepends before
/// attacker-controlled input; `prefix_fill` is the filler needed to complete
/// that prefix to a block boundary. Both are 0 for a prefix-free oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub prefix_len: usize,
    pub prefix_fill: usize,
    pub block_size: usize,
}

/// Longest probe plaintext submitted before a misbehaving oracle is reported
/// as unbounded.
const MAX_PROBE_INPUT: usize = 512;

/// Two distinct filler bytes. Prefix detection runs once with each: a prefix
/// tail that happens to equal one filler byte skews that filler's estimate,
/// but a single byte cannot equal both.
const PROBE_FILLERS: [u8; 2] = [b'A', b'B'];

/// Infer the oracle's block size from ciphertext-length jumps.
///
/// Growing all-identical-byte inputs are absorbed into the oracle's trailing
/// padding block until it overflows, at which point the output grows by one
/// block. The input-length gap between two consecutive jumps is the block
/// size; each jump must also grow the output by exactly that amount, which
/// rules out a coincidental first jump.
pub fn detect_block_size<O: Oracle + ?Sized>(oracle: &O) -> Result<usize> {
    let base_len = oracle.encrypt(&[]).len();
    // (input length at the first jump, output length after it)
    let mut first_jump: Option<(usize, usize)> = None;

    for probe_len in 1..=MAX_PROBE_INPUT {
        let out_len = oracle.encrypt(&vec![PROBE_FILLERS[0]; probe_len]).len();

        match first_jump {
            None => {
                if out_len < base_len {
                    return Err(Error::Inconclusive(format!(
                        "oracle output shrank from {base_len} to {out_len} bytes"
                    )));
                }
                if out_len > base_len {
                    debug!(probe_len, base_len, out_len, "first output-length jump");
                    first_jump = Some((probe_len, out_len));
                }
            }
            Some((first_at, jumped_len)) => {
                if out_len != jumped_len {
                    if out_len < jumped_len {
                        return Err(Error::Inconclusive(format!(
                            "oracle output shrank from {jumped_len} to {out_len} bytes"
                        )));
                    }
                    let block_size = probe_len - first_at;
                    debug!(probe_len, block_size, "second output-length jump");
                    if out_len - jumped_len == block_size && jumped_len - base_len == block_size
                    {
                        return Ok(block_size);
                    }
                    return Err(Error::Inconclusive(format!(
                        "output-length jumps are not periodic: {base_len} -> {jumped_len} -> \
                         {out_len} over a {block_size}-byte input gap"
                    )));
                }
                // the second jump must arrive within a block of the first;
                // twice that is already generous
                if probe_len - first_at > 2 * (jumped_len - base_len) {
                    return Err(Error::Inconclusive(
                        "no second output-length jump within two blocks of the first".to_string(),
                    ));
                }
            }
        }
    }

    Err(Error::UnboundedOracle {
        budget: MAX_PROBE_INPUT,
    })
}

/// Locate the oracle's fixed prefix, or `None` when no repeated filler block
/// ever shows up (as under CBC, or an oracle that ignores its input).
///
/// Returns `(prefix_len, prefix_fill)`.
fn detect_prefix<O: Oracle + ?Sized>(oracle: &O, block_size: usize) -> Option<(usize, usize)> {
    // blocks that are identical for two different one-byte inputs are pure
    // prefix, so the first differing block is where the prefix ends
    let c1 = oracle.encrypt(&[PROBE_FILLERS[0]]);
    let c2 = oracle.encrypt(&[PROBE_FILLERS[1]]);
    let boundary_block = c1
        .chunks_exact(block_size)
        .zip(c2.chunks_exact(block_size))
        .position(|(a, b)| a != b)?;

    let mut candidates = Vec::new();
    for &filler in &PROBE_FILLERS {
        'fill: for fill in 0..block_size {
            let ciphertext = oracle.encrypt(&vec![filler; fill + 2 * block_size]);
            let blocks = ciphertext.chunks_exact(block_size).collect::<Vec<_>>();

            for j in boundary_block..blocks.len().saturating_sub(1) {
                if blocks[j] != blocks[j + 1] {
                    continue;
                }
                // a run of pure filler became block-aligned: the prefix ends
                // where the filler began
                let Some(prefix_len) = (j * block_size).checked_sub(fill) else {
                    continue;
                };
                // the prefix must end inside the boundary block
                if prefix_len < boundary_block * block_size
                    || prefix_len >= (boundary_block + 1) * block_size
                {
                    continue;
                }
                debug!(filler, fill, block = j, prefix_len, "repeated filler block");
                candidates.push(prefix_len);
                break 'fill;
            }
        }
    }

    // a prefix tail equal to a filler byte makes that filler's run look
    // longer than it is, underestimating the prefix; take the larger answer
    let prefix_len = candidates.into_iter().max()?;
    let prefix_fill = (block_size - prefix_len % block_size) % block_size;
    Some((prefix_len, prefix_fill))
}

/// Infer block size, prefix length, and prefix fill in one go.
///
/// Prefix location needs the oracle to expose repeated blocks, so this only
/// succeeds against ECB; anything else is `Inconclusive`.
pub fn detect_block_layout<O: Oracle + ?Sized>(oracle: &O) -> Result<BlockLayout> {
    let block_size = detect_block_size(oracle)?;
    let (prefix_len, prefix_fill) = detect_prefix(oracle, block_size).ok_or_else(|| {
        Error::Inconclusive(
            "no repeated filler block within a block's worth of fill; cannot locate the prefix"
                .to_string(),
        )
    })?;
    Ok(BlockLayout {
        prefix_len,
        prefix_fill,
        block_size,
    })
}

fn has_repeated_block(ciphertext: &[u8], block_size: usize) -> bool {
    let blocks = ciphertext.chunks_exact(block_size);
    let unique_blocks = blocks.clone().collect::<HashSet<_>>();
    blocks.len() != unique_blocks.len()
}

/// Classify the oracle as ECB or CBC.
///
/// A single probe of at least three blocks of one repeated byte (front-padded
/// to a block boundary when the prefix is locatable, a full block of slack
/// when it is not) guarantees at least two identical aligned plaintext
/// blocks. Under ECB those repeat in the ciphertext; under CBC they cannot,
/// short of a chance collision. The `Cbc` answer is therefore probabilistic,
/// absence of a collision rather than proof of one's impossibility.
pub fn detect_block_mode<O: Oracle + ?Sized>(oracle: &O) -> Result<BlockMode> {
    let block_size = detect_block_size(oracle)?;
    let fill = detect_prefix(oracle, block_size).map_or(block_size, |(_, fill)| fill);

    let probe = vec![PROBE_FILLERS[0]; fill + 3 * block_size];
    let ciphertext = oracle.encrypt(&probe);

    let mode = if has_repeated_block(&ciphertext, block_size) {
        BlockMode::Ecb
    } else {
        BlockMode::Cbc
    };
    debug!(?mode, block_size, fill, "classified oracle");
    Ok(mode)
}

/// Recover an ECB oracle's secret suffix one byte at a time.
///
/// With everything before the target byte known (prefix alignment from
/// [`detect_block_layout`], filler, and the bytes already recovered), the
/// target is pinned as the last unknown byte of some block, and 256 probes
/// find it. The scan walks off the end of the suffix into the oracle's own
/// padding, so the last recovered byte is always the `0x01` pad of the final
/// short probe; it is checked and discarded.
pub fn recover_ecb_suffix<O: Oracle + ?Sized>(oracle: &O) -> Result<Vec<u8>> {
    let layout = detect_block_layout(oracle)?;
    if detect_block_mode(oracle)? != BlockMode::Ecb {
        return Err(Error::Inconclusive(
            "suffix recovery needs an ECB oracle".to_string(),
        ));
    }

    let block_size = layout.block_size;
    let base = layout.prefix_len + layout.prefix_fill;
    let base_block = base / block_size;
    let filler = PROBE_FILLERS[0];

    // everything past the aligned prefix is suffix plus padding
    let padded_suffix_len = oracle
        .encrypt(&vec![filler; layout.prefix_fill])
        .len()
        .saturating_sub(base);

    let mut recovered: Vec<u8> = Vec::new();
    while recovered.len() < padded_suffix_len {
        let i = recovered.len();
        // shift the suffix so its next unknown byte lands last in its block
        let fill_len = layout.prefix_fill + block_size - (i % block_size) - 1;
        let block_idx = base_block + i / block_size;

        let reference = oracle.encrypt(&vec![filler; fill_len]);
        let Some(reference_block) = reference.chunks_exact(block_size).nth(block_idx) else {
            break;
        };

        let mut found = None;
        for byte in 0..=255u8 {
            let mut probe = vec![filler; fill_len];
            probe.extend_from_slice(&recovered);
            probe.push(byte);

            let ciphertext = oracle.encrypt(&probe);
            if ciphertext.chunks_exact(block_size).nth(block_idx) == Some(reference_block) {
                found = Some(byte);
                break;
            }
        }

        match found {
            Some(byte) => {
                debug!(position = i, byte, "recovered suffix byte");
                recovered.push(byte);
            }
            // the reference block now covers two or more padding bytes whose
            // values changed under the shorter fill, so nothing can match
            None => break,
        }
    }

    if recovered.pop() != Some(0x01) {
        return Err(Error::Inconclusive(
            "suffix recovery did not terminate at a padding byte".to_string(),
        ));
    }
    Ok(recovered)
}

/// Test-harness oracle: a fixed random key, a fixed prefix and suffix around
/// the caller's plaintext, and a fixed mode. CBC draws a fresh random IV per
/// call, as a real system would.
pub struct AffixingOracle {
    mode: BlockMode,
    key: Vec<u8>,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

impl AffixingOracle {
    /// Random mode, key, and 5-10 byte prefix and suffix.
    pub fn new_random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let mode = if rng.gen_bool(0.5) {
            BlockMode::Ecb
        } else {
            BlockMode::Cbc
        };
        let prefix_len = rng.gen_range(5..=10);
        let suffix_len = rng.gen_range(5..=10);

        AffixingOracle {
            mode,
            key: gen_random_bytes(16),
            prefix: gen_random_bytes(prefix_len),
            suffix: gen_random_bytes(suffix_len),
        }
    }

    pub fn new_ecb(key: Vec<u8>, prefix: Vec<u8>, suffix: Vec<u8>) -> Self {
        AffixingOracle {
            mode: BlockMode::Ecb,
            key,
            prefix,
            suffix,
        }
    }

    pub fn new_cbc(key: Vec<u8>, prefix: Vec<u8>, suffix: Vec<u8>) -> Self {
        AffixingOracle {
            mode: BlockMode::Cbc,
            key,
            prefix,
            suffix,
        }
    }

    /// The mode this oracle actually uses, for checking a classification.
    pub fn mode(&self) -> BlockMode {
        self.mode
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let affixed = [self.prefix.as_slice(), plaintext, &self.suffix].concat();
        let padded = pad_to_block_multiple(&affixed, BLOCK_SIZE)
            .expect("block size is a nonzero constant");
        match self.mode {
            BlockMode::Ecb => aes::encrypt_ecb(&padded, &self.key),
            BlockMode::Cbc => aes::encrypt_cbc(&padded, &self.key, &gen_random_bytes(BLOCK_SIZE)),
        }
        .expect("key and input lengths are valid by construction")
    }

    /// Adapt this harness to the [`Oracle`] capability the detectors take.
    pub fn as_oracle(&self) -> impl Oracle + '_ {
        move |plaintext: &[u8]| self.encrypt(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> Vec<u8> {
        gen_random_bytes(16)
    }

    // a fixed prefix that shares no bytes with the probe fillers
    const PREFIX_10: &[u8] = b"0123456789";
    const SUFFIX: &[u8] = b"Hi there, my name is nobody";

    #[test]
    fn test_detect_block_size() {
        let oracle = AffixingOracle::new_ecb(random_key(), Vec::new(), SUFFIX.to_vec());
        assert_eq!(detect_block_size(&oracle.as_oracle()).unwrap(), 16);

        let oracle = AffixingOracle::new_cbc(random_key(), PREFIX_10.to_vec(), SUFFIX.to_vec());
        assert_eq!(detect_block_size(&oracle.as_oracle()).unwrap(), 16);
    }

    #[test]
    fn test_detect_block_size_unbounded_oracle() {
        // length never reacts to input: probing must give up, not loop
        let oracle = |_: &[u8]| vec![0u8; 32];
        assert!(matches!(
            detect_block_size(&oracle),
            Err(Error::UnboundedOracle { .. })
        ));
    }

    #[test]
    fn test_detect_block_layout_without_prefix() {
        let oracle = AffixingOracle::new_ecb(random_key(), Vec::new(), SUFFIX.to_vec());
        let layout = detect_block_layout(&oracle.as_oracle()).unwrap();
        assert_eq!(
            layout,
            BlockLayout {
                prefix_len: 0,
                prefix_fill: 0,
                block_size: 16
            }
        );
    }

    #[test]
    fn test_detect_block_layout_with_10_byte_prefix() {
        let oracle = AffixingOracle::new_ecb(random_key(), PREFIX_10.to_vec(), SUFFIX.to_vec());
        let layout = detect_block_layout(&oracle.as_oracle()).unwrap();
        assert_eq!(
            layout,
            BlockLayout {
                prefix_len: 10,
                prefix_fill: 6,
                block_size: 16
            }
        );
    }

    #[test]
    fn test_detect_block_layout_with_block_aligned_prefix() {
        let prefix = b"exactly sixteen.".to_vec();
        let oracle = AffixingOracle::new_ecb(random_key(), prefix, SUFFIX.to_vec());
        let layout = detect_block_layout(&oracle.as_oracle()).unwrap();
        assert_eq!(
            layout,
            BlockLayout {
                prefix_len: 16,
                prefix_fill: 0,
                block_size: 16
            }
        );
    }

    #[test]
    fn test_detect_block_layout_inconclusive_for_cbc() {
        let oracle = AffixingOracle::new_cbc(random_key(), PREFIX_10.to_vec(), SUFFIX.to_vec());
        assert!(matches!(
            detect_block_layout(&oracle.as_oracle()),
            Err(Error::Inconclusive(_))
        ));
    }

    #[test]
    fn test_detect_block_mode_ecb() {
        let oracle = AffixingOracle::new_ecb(random_key(), PREFIX_10.to_vec(), SUFFIX.to_vec());
        assert_eq!(
            detect_block_mode(&oracle.as_oracle()).unwrap(),
            BlockMode::Ecb
        );
    }

    #[test]
    fn test_detect_block_mode_cbc() {
        let oracle = AffixingOracle::new_cbc(random_key(), PREFIX_10.to_vec(), SUFFIX.to_vec());
        assert_eq!(
            detect_block_mode(&oracle.as_oracle()).unwrap(),
            BlockMode::Cbc
        );
    }

    // depends on the oracle's randomness; under CBC a false collision has
    // probability around 2^-128 per round
    #[test]
    fn test_detect_block_mode_random_oracles() {
        for _ in 0..100 {
            let oracle = AffixingOracle::new_random();
            let guessed = detect_block_mode(&oracle.as_oracle()).unwrap();
            assert_eq!(guessed, oracle.mode());
        }
    }

    #[test]
    fn test_detect_block_mode_closure_oracle() {
        let key = random_key();
        let oracle = move |plaintext: &[u8]| {
            let padded = pad_to_block_multiple(plaintext, 16).unwrap();
            aes::encrypt_ecb(&padded, &key).unwrap()
        };
        assert_eq!(detect_block_mode(&oracle).unwrap(), BlockMode::Ecb);
    }

    #[test]
    fn test_recover_ecb_suffix_without_prefix() {
        let oracle = AffixingOracle::new_ecb(random_key(), Vec::new(), SUFFIX.to_vec());
        assert_eq!(recover_ecb_suffix(&oracle.as_oracle()).unwrap(), SUFFIX);
    }

    #[test]
    fn test_recover_ecb_suffix_behind_prefix() {
        let oracle = AffixingOracle::new_ecb(random_key(), PREFIX_10.to_vec(), SUFFIX.to_vec());
        assert_eq!(recover_ecb_suffix(&oracle.as_oracle()).unwrap(), SUFFIX);
    }

    #[test]
    fn test_recover_ecb_suffix_empty_suffix() {
        let oracle = AffixingOracle::new_ecb(random_key(), PREFIX_10.to_vec(), Vec::new());
        assert_eq!(recover_ecb_suffix(&oracle.as_oracle()).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_recover_ecb_suffix_rejects_cbc() {
        let oracle = AffixingOracle::new_cbc(random_key(), Vec::new(), SUFFIX.to_vec());
        assert!(recover_ecb_suffix(&oracle.as_oracle()).is_err());
    }
}
