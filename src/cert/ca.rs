//! Root CA certificate operations.
//!
//! This module provides functions for creating self-signed Root CA certificates.

use crate::cert::builder::{CertificateDescription, ValidityWindow, SERVER_AUTH};
use crate::cert::x509_signing::{sign_certificate, IssuedCertificate};
use crate::crypto::keys::{KeyAlgorithm, KeyPair};
use crate::error::Result;
use rand::{CryptoRng, RngCore};
use x509_cert::ext::pkix::{KeyUsage, KeyUsages};

/// Create a self-signed RSA-2048 Root CA certificate.
///
/// The key is generated first and the certificate signed second, both drawing
/// from `rng`.
///
/// # Arguments
///
/// * `rng` - Entropy source for key generation and signing
/// * `subject` - The subject distinguished name (e.g., "O=Acme Co,CN=Root CA")
/// * `serial` - Serial number of the certificate
/// * `validity` - Validity window
///
/// # Example
///
/// ```
/// use detcert::cert::builder::ValidityWindow;
/// use detcert::cert::ca::create_root_ca;
/// use detcert::crypto::aes_random::AesRandom;
///
/// # fn example() -> detcert::error::Result<()> {
/// let mut rng = AesRandom::from_phrase("doc example");
/// let root = create_root_ca(&mut rng, "O=Acme Co,CN=Root CA", 1, &ValidityWindow::fixture()?)?;
/// assert!(root.to_pem()?.contains("BEGIN CERTIFICATE"));
/// # Ok(())
/// # }
/// ```
pub fn create_root_ca<R: RngCore + CryptoRng>(
    rng: &mut R,
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

    let certificate = sign_certificate(&desc, &key_pair, None, rng)?;
    log::info!("Issued root CA '{}' (serial {})", subject, serial);

    Ok(IssuedCertificate {
        certificate,
        key_pair,
    })
}
