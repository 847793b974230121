//! detcert: deterministic test certificate fixtures
//!
//! This library regenerates a fixed certificate chain for TLS tests from a
//! seed phrase, so that repeated runs produce byte-identical keys and
//! certificates. It provides:
//!
//! - An AES-CTR deterministic byte generator usable as a `RngCore`
//! - RSA-2048 and ECDSA P-256 key generation driven by that generator
//! - X.509 issuance for a root CA, an intermediate CA and two leaf certificates
//! - Writing the fixtures to disk through pluggable external tools
//!
//! # Architecture
//!
//! Every operation that needs randomness takes the entropy source as an
//! explicit `&mut R` argument. Nothing reads system entropy, so the bytes
//! consumed by each step are fixed by call order alone. All operations
//! return `Result` types; library code does not panic.
//!
//! # Example
//!
//! ```rust,no_run
//! use detcert::cert::chain::FixtureChain;
//! use detcert::crypto::aes_random::{AesRandom, DEFAULT_SEED_PHRASE};
//! use detcert::error::Result;
//!
//! fn example() -> Result<()> {
//!     let mut rng = AesRandom::from_phrase(DEFAULT_SEED_PHRASE);
//!     let chain = FixtureChain::generate(&mut rng)?;
//!     println!("{}", chain.root.to_pem()?);
//!     Ok(())
//! }
//! ```

pub mod cert;
pub mod crypto;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use error::{DetCertError, Result};
