//! Intermediate CA certificate operations.
//!
//! This module provides functions for creating Intermediate CA certificates signed by a Root CA.

use crate::cert::builder::{CertificateDescription, ValidityWindow, SERVER_AUTH};
use crate::cert::x509_signing::{sign_certificate, IssuedCertificate};
use crate::crypto::keys::{KeyAlgorithm, KeyPair};
use crate::error::Result;
use rand::{CryptoRng, RngCore};
use x509_cert::ext::pkix::{KeyUsage, KeyUsages};

/// Create an RSA-2048 Intermediate CA certificate signed by `root`.
///
/// # Arguments
///
/// * `rng` - Entropy source for key generation and signing
/// * `root` - The Root CA that signs this intermediate
/// * `subject` - The subject distinguished name (e.g., "O=Acme Co,CN=Intermediate CA")
/// * `serial` - Serial number of the certificate
/// * `validity` - Validity window
///
/// # Example
///
/// ```
/// use detcert::cert::builder::ValidityWindow;
/// use detcert::cert::ca::create_root_ca;
/// use detcert::cert::intermediate::create_intermediate_ca;
/// use detcert::crypto::aes_random::AesRandom;
///
/// # fn example() -> detcert::error::Result<()> {
/// let mut rng = AesRandom::from_phrase("doc example");
/// let validity = ValidityWindow::fixture()?;
/// let root = create_root_ca(&mut rng, "CN=Root CA", 1, &validity)?;
/// let inter = create_intermediate_ca(&mut rng, &root, "CN=Intermediate CA", 2, &validity)?;
/// assert!(inter.to_pem()?.contains("BEGIN CERTIFICATE"));
/// # Ok(())
/// # }
/// ```
pub fn create_intermediate_ca<R: RngCore + CryptoRng>(
    rng: &mut R,
    root: &IssuedCertificate,
    subject: &str,
    serial: u64,
    validity: &ValidityWindow,
) -> Result<IssuedCertificate> {
    let key_pair = KeyPair::generate(KeyAlgorithm::Rsa2048, rng)?;

    let desc = CertificateDescription {
        serial,
        subject: subject.to_string(),
        validity: *validity,
        key_usage: KeyUsage(KeyUsages::KeyCertSign.into()),
        extended_key_usage: vec![SERVER_AUTH],
        is_ca: true,
        dns_names: Vec::new(),
    };

    let certificate = sign_certificate(&desc, &key_pair, Some(root.as_issuer()), rng)?;
    log::info!("Issued intermediate CA '{}' (serial {})", subject, serial);

    Ok(IssuedCertificate {
        certificate,
        key_pair,
    })
}
