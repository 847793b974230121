//! Cryptographic operations module.
//!
//! This module provides the randomness and key primitives for detcert:
//!
//! - A deterministic AES counter-mode generator usable as an entropy source
//! - RSA-2048 and ECDSA P-256 key generation, signing and verification
//!
//! Nothing here reaches for OS randomness. Callers inject the entropy source,
//! so a fixed seed reproduces every key and signature.
//!
//! # Example
//!
//! ```rust
//! use detcert::crypto::aes_random::{AesRandom, DEFAULT_SEED_PHRASE};
//! use detcert::crypto::keys::{KeyAlgorithm, KeyPair};
//!
//! # fn example() -> detcert::error::Result<()> {
//! let mut rng = AesRandom::from_phrase(DEFAULT_SEED_PHRASE);
//! let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng)?;
//!
//! let signature = key.sign(&mut rng, b"payload")?;
//! key.public_key().verify(b"payload", &signature)?;
//! # Ok(())
//! # }
//! ```

pub mod aes_random;
pub mod keys;
