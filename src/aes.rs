//! AES-128 in ECB and CBC modes.
//!
//! openssl supplies the raw block transformation only: we always ask it for
//! ECB with padding disabled, and build CBC ourselves by chaining. The
//! point of the exercise is owning the mode, not the S-boxes.

use openssl::symm::{self, Crypter, Mode};

use crate::error::{Error, Result};
use crate::xor::xor;

/// AES-128 block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// The all-zero IV the original tooling defaulted to.
pub const ZERO_IV: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

fn check_args(data: &[u8], key: &[u8]) -> Result<()> {
    if key.len() != BLOCK_SIZE {
        return Err(Error::InvalidArgument(format!(
            "AES-128 key must be {BLOCK_SIZE} bytes, got {}",
            key.len()
        )));
    }
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::InvalidArgument(format!(
            "input length {} is not a multiple of the {BLOCK_SIZE}-byte block size",
            data.len()
        )));
    }
    Ok(())
}

/// Run the raw ECB primitive over a whole buffer, padding disabled.
fn ecb_raw(data: &[u8], key: &[u8], mode: Mode) -> Result<Vec<u8>> {
    let cipher = symm::Cipher::aes_128_ecb();
    let mut crypter = Crypter::new(cipher, mode, key, None)?;
    crypter.pad(false);

    let mut out = vec![0; data.len() + cipher.block_size()];
    let mut count = crypter.update(data, &mut out)?;
    count += crypter.finalize(&mut out[count..])?;
    out.truncate(count);
    Ok(out)
}

/// ECB-encrypt `plaintext` with `key`. The input must already be padded to a
/// multiple of [`BLOCK_SIZE`]; see [`crate::padding::pad_to_block_multiple`].
pub fn encrypt_ecb(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_args(plaintext, key)?;
    ecb_raw(plaintext, key, Mode::Encrypt)
}

/// ECB-decrypt `ciphertext` with `key`. Padding is not removed.
pub fn decrypt_ecb(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_args(ciphertext, key)?;
    ecb_raw(ciphertext, key, Mode::Decrypt)
}

fn check_iv(iv: &[u8]) -> Result<()> {
    if iv.len() != BLOCK_SIZE {
        return Err(Error::InvalidArgument(format!(
            "IV must be {BLOCK_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

/// CBC-encrypt `plaintext` with `key`: each block is XORed with the previous
/// ciphertext block (the IV for the first) before ECB encryption.
pub fn encrypt_cbc(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    check_args(plaintext, key)?;
    check_iv(iv)?;

    let mut ciphertext = Vec::with_capacity(plaintext.len());
    let mut last_block = iv.to_vec();

    for block in plaintext.chunks_exact(BLOCK_SIZE) {
        last_block = ecb_raw(&xor(block, &last_block), key, Mode::Encrypt)?;
        ciphertext.extend_from_slice(&last_block);
    }

    Ok(ciphertext)
}

/// CBC-decrypt `ciphertext` with `key`: the IV acts as a virtual zeroth
/// ciphertext block; each plaintext block is the ECB decryption of its block
/// XORed with the preceding ciphertext block. Exact inverse of
/// [`encrypt_cbc`]; padding is not removed.
pub fn decrypt_cbc(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    check_args(ciphertext, key)?;
    check_iv(iv)?;

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut last_block = iv;

    for block in ciphertext.chunks_exact(BLOCK_SIZE) {
        let decrypted = ecb_raw(block, key, Mode::Decrypt)?;
        plaintext.extend_from_slice(&xor(&decrypted, last_block));
        last_block = block;
    }

    Ok(plaintext)
}

/// Generate `len` random bytes, for keys, IVs, and oracle affixes.
pub fn gen_random_bytes(len: usize) -> Vec<u8> {
    use rand::Rng;
    (0..len).map(|_| rand::thread_rng().gen()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"This is 16 bytes";
    const PLAINTEXTS: &[&[u8]] = &[
        // two blocks
        b"My name is Ozymandias, King of K",
        // exactly 1 block
        b"0123456789abcdef",
        // empty
        b"",
    ];

    #[test]
    fn test_ecb_matches_openssl() {
        use openssl::symm::{encrypt, Cipher};
        let cipher = Cipher::aes_128_ecb();

        for &plaintext in PLAINTEXTS {
            // openssl's one-shot encrypt appends a full PKCS#7 padding block
            // for aligned input, so compare against all but that final block
            let expected = encrypt(cipher, KEY, None, plaintext).unwrap();
            let actual = encrypt_ecb(plaintext, KEY).unwrap();

            assert_eq!(
                actual,
                expected[..plaintext.len()],
                r#"plaintext: "{}""#,
                plaintext.escape_ascii()
            );
        }
    }

    #[test]
    fn test_ecb_round_trip() {
        for &plaintext in PLAINTEXTS {
            let ciphertext = encrypt_ecb(plaintext, KEY).unwrap();
            assert_eq!(decrypt_ecb(&ciphertext, KEY).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_cbc_matches_openssl() {
        use openssl::symm::{encrypt, Cipher};
        let cipher = Cipher::aes_128_cbc();

        for &plaintext in PLAINTEXTS {
            let iv = gen_random_bytes(16);
            let expected = encrypt(cipher, KEY, Some(&iv), plaintext).unwrap();
            let actual = encrypt_cbc(plaintext, KEY, &iv).unwrap();

            assert_eq!(
                actual,
                expected[..plaintext.len()],
                r#"plaintext: "{}""#,
                plaintext.escape_ascii()
            );
        }
    }

    #[test]
    fn test_cbc_round_trip() {
        for &plaintext in PLAINTEXTS {
            let iv = gen_random_bytes(16);
            let ciphertext = encrypt_cbc(plaintext, KEY, &iv).unwrap();
            assert_eq!(decrypt_cbc(&ciphertext, KEY, &iv).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_cbc_zero_iv_default() {
        let plaintext = b"0123456789abcdef0123456789abcdef";
        let ciphertext = encrypt_cbc(plaintext, KEY, &ZERO_IV).unwrap();
        assert_eq!(decrypt_cbc(&ciphertext, KEY, &ZERO_IV).unwrap(), plaintext);
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(encrypt_ecb(&[0; 16], b"short key").is_err());
        assert!(decrypt_ecb(&[0; 16], b"short key").is_err());
    }

    #[test]
    fn test_rejects_non_block_multiple() {
        assert!(encrypt_ecb(&[0; 15], KEY).is_err());
        assert!(decrypt_cbc(&[0; 17], KEY, &ZERO_IV).is_err());
    }

    #[test]
    fn test_rejects_bad_iv_length() {
        assert!(encrypt_cbc(&[0; 16], KEY, &[0; 8]).is_err());
    }

    #[test]
    fn test_identical_plaintext_blocks_repeat_under_ecb_only() {
        let plaintext = [7u8; 32];
        let ecb = encrypt_ecb(&plaintext, KEY).unwrap();
        assert_eq!(ecb[..16], ecb[16..32]);

        let cbc = encrypt_cbc(&plaintext, KEY, &ZERO_IV).unwrap();
        assert_ne!(cbc[..16], cbc[16..32]);
    }
}
