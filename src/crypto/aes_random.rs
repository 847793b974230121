//! Deterministic random generator using AES in counter mode.
//!
//! `AesRandom` encrypts successive counter blocks under a fixed key and hands
//! out the ciphertext as a byte stream. It implements `RngCore + CryptoRng` so
//! it can stand in for an OS entropy source in key generation and signing,
//! which makes every certificate and key produced from it reproducible.
//!
//! This is for test fixtures only. A seeded generator is not a secure source.
//!
//! # Example
//!
//! ```
//! use detcert::crypto::aes_random::{AesRandom, DEFAULT_SEED_PHRASE};
//!
//! let mut a = AesRandom::from_phrase(DEFAULT_SEED_PHRASE);
//! let mut b = AesRandom::from_phrase(DEFAULT_SEED_PHRASE);
//!
//! let mut x = [0u8; 40];
//! let mut y = [0u8; 40];
//! assert_eq!(a.fill(&mut x), 40);
//! b.fill(&mut y);
//! assert_eq!(x, y);
//! ```

use crate::error::{DetCertError, Result};
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// AES block size in bytes. The counter and scratch buffer are one block each.
pub const BLOCK_SIZE: usize = 16;

/// Phrase the fixture seed is derived from.
pub const DEFAULT_SEED_PHRASE: &str = "seed for deterministic randomness";

/// Derive a 16-byte seed from a text phrase: SHA-256, truncated to one block.
pub fn derive_seed(phrase: &str) -> [u8; BLOCK_SIZE] {
    let digest = Sha256::digest(phrase.as_bytes());
    let mut seed = [0u8; BLOCK_SIZE];
    seed.copy_from_slice(&digest[..BLOCK_SIZE]);
    seed
}

/// Increment a counter block by one.
///
/// Byte 0 is least significant. The carry runs through every byte, so an
/// all-`0xFF` block wraps to all zeros.
pub fn increment_counter(counter: &mut [u8; BLOCK_SIZE]) {
    let mut carry = 1u16;
    for byte in counter.iter_mut() {
        carry += u16::from(*byte);
        *byte = carry as u8;
        carry >>= 8;
    }
}

/// AES keyed with the seed; the variant follows the seed length.
enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockCipher {
    fn new(key: &[u8]) -> Result<Self> {
        let invalid = |_| DetCertError::InvalidSeedLength(key.len());
        match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(key).map(Self::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            len => Err(DetCertError::InvalidSeedLength(len)),
        }
    }

    fn encrypt(&self, input: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        let input = Block::from(*input);
        let mut output = Block::default();
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block_b2b(&input, &mut output),
            Self::Aes192(cipher) => cipher.encrypt_block_b2b(&input, &mut output),
            Self::Aes256(cipher) => cipher.encrypt_block_b2b(&input, &mut output),
        }
        output.into()
    }
}

/// Counter-mode byte generator.
pub struct AesRandom {
    cipher: BlockCipher,
    /// Most recently encrypted block that was only partly handed out.
    buf: [u8; BLOCK_SIZE],
    counter: [u8; BLOCK_SIZE],
    /// Bytes of `buf` already consumed; always in `0..BLOCK_SIZE`.
    offset: usize,
}

impl AesRandom {
    /// Create a generator keyed with `seed`.
    ///
    /// Fails with `InvalidSeedLength` unless the seed is 16, 24 or 32 bytes.
    pub fn new(seed: &[u8]) -> Result<Self> {
        let cipher = BlockCipher::new(seed)?;
        log::debug!("Initialized AES-CTR generator with {}-byte seed", seed.len());
        Ok(Self::with_cipher(cipher))
    }

    /// Create a generator from a seed phrase via [`derive_seed`].
    pub fn from_phrase(phrase: &str) -> Self {
        let seed = derive_seed(phrase);
        Self::with_cipher(BlockCipher::Aes128(Aes128::new(&seed.into())))
    }

    fn with_cipher(cipher: BlockCipher) -> Self {
        Self {
            cipher,
            buf: [0u8; BLOCK_SIZE],
            counter: [0u8; BLOCK_SIZE],
            offset: 0,
        }
    }

    /// Fill `dest` with the next bytes of the stream.
    ///
    /// Always writes the whole slice and returns its length.
    pub fn fill(&mut self, dest: &mut [u8]) -> usize {
        let total = dest.len();
        let mut dest = dest;

        if self.offset != 0 {
            let tail = &self.buf[self.offset..];
            let n = tail.len().min(dest.len());
            dest[..n].copy_from_slice(&tail[..n]);
            self.offset = (self.offset + n) % BLOCK_SIZE;
            dest = &mut std::mem::take(&mut dest)[n..];
        }

        while dest.len() >= BLOCK_SIZE {
            let (block, rest) = std::mem::take(&mut dest).split_at_mut(BLOCK_SIZE);
            block.copy_from_slice(&self.cipher.encrypt(&self.counter));
            increment_counter(&mut self.counter);
            dest = rest;
        }

        if !dest.is_empty() {
            self.buf = self.cipher.encrypt(&self.counter);
            increment_counter(&mut self.counter);
            let n = dest.len();
            dest.copy_from_slice(&self.buf[..n]);
            self.offset = n;
        }

        total
    }
}

impl RngCore for AesRandom {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill(dest);
        Ok(())
    }
}

// Marker only: lets the generator be passed where a CSPRNG is required.
impl CryptoRng for AesRandom {}
