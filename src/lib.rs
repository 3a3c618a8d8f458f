//! Classical symmetric-cipher cryptanalysis toolkit.
//!
//! The supporting cast (hex and string codecs, XOR ciphers with
//! frequency-based key recovery, Hamming-distance key-length estimation,
//! PKCS#7 padding, and AES-128 ECB/CBC built by hand over the raw block
//! primitive) exists to feed the interesting part: [`oracle`], which probes
//! an opaque encrypt-function and infers its block size, prefix layout, and
//! cipher mode from nothing but ciphertext structure.
//!
//! Everything is synchronous and pure; the only "I/O" is calling the
//! caller-supplied oracle. None of this is production cryptography: the ECB
//! weaknesses exploited here are exactly why these constructions are studied
//! rather than deployed.
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod aes;
pub mod codec;
pub mod error;
pub mod hamming;
pub mod oracle;
pub mod padding;
pub mod xor;

pub use error::{Error, Result};
