//! End-entity certificate operations.
//!
//! This module provides functions for creating end-entity certificates signed by an Intermediate CA.

use crate::cert::builder::{CertificateDescription, ValidityWindow, SERVER_AUTH};
use crate::cert::x509_signing::{cert_to_pem, sign_certificate, IssuedCertificate};
use crate::crypto::keys::{KeyAlgorithm, KeyPair};
use crate::error::Result;
use rand::{CryptoRng, RngCore};
use x509_cert::certificate::Certificate;
use x509_cert::ext::pkix::{KeyUsage, KeyUsages};

/// Key usage for a leaf key of `algorithm`.
///
/// RSA keys can encipher session keys; EC keys only sign.
pub fn leaf_key_usage(algorithm: KeyAlgorithm) -> KeyUsage {
    match algorithm {
        KeyAlgorithm::Rsa2048 => {
            KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
        }
        KeyAlgorithm::EcdsaP256 => KeyUsage(KeyUsages::DigitalSignature.into()),
    }
}

/// Create a server-auth end-entity certificate signed by `issuer`.
///
/// # Arguments
///
/// * `rng` - Entropy source for key generation and signing
/// * `issuer` - The Intermediate CA that signs this certificate
/// * `algorithm` - Key algorithm of the new leaf key
/// * `subject` - The subject distinguished name (e.g., "O=My Org,CN=example.com")
/// * `dns_names` - DNS subject alternative names
/// * `serial` - Serial number of the certificate
/// * `validity` - Validity window
///
/// # Example
///
/// ```
/// use detcert::cert::builder::ValidityWindow;
/// use detcert::cert::ca::create_root_ca;
/// use detcert::cert::intermediate::create_intermediate_ca;
/// use detcert::cert::entity::create_end_entity_cert;
/// use detcert::crypto::aes_random::AesRandom;
/// use detcert::crypto::keys::KeyAlgorithm;
///
/// # fn example() -> detcert::error::Result<()> {
/// let mut rng = AesRandom::from_phrase("doc example");
/// let validity = ValidityWindow::fixture()?;
/// let root = create_root_ca(&mut rng, "CN=Root CA", 1, &validity)?;
/// let inter = create_intermediate_ca(&mut rng, &root, "CN=Intermediate CA", 2, &validity)?;
/// let leaf = create_end_entity_cert(
///     &mut rng,
///     &inter,
///     KeyAlgorithm::EcdsaP256,
///     "CN=example.com",
///     &["example.com".to_string()],
///     3,
///     &validity,
/// )?;
/// assert!(leaf.to_pem()?.contains("BEGIN CERTIFICATE"));
/// # Ok(())
/// # }
/// ```
pub fn create_end_entity_cert<R: RngCore + CryptoRng>(
    rng: &mut R,
    issuer: &IssuedCertificate,
    algorithm: KeyAlgorithm,
    subject: &str,
    dns_names: &[String],
    serial: u64,
    validity: &ValidityWindow,
) -> Result<IssuedCertificate> {
    let key_pair = KeyPair::generate(algorithm, rng)?;

    let desc = CertificateDescription {
        serial,
        subject: subject.to_string(),
        validity: *validity,
        key_usage: leaf_key_usage(algorithm),
        extended_key_usage: vec![SERVER_AUTH],
        is_ca: false,
        dns_names: dns_names.to_vec(),
    };

    let certificate = sign_certificate(&desc, &key_pair, Some(issuer.as_issuer()), rng)?;
    log::info!(
        "Issued {} end-entity certificate '{}' (serial {})",
        algorithm,
        subject,
        serial
    );

    Ok(IssuedCertificate {
        certificate,
        key_pair,
    })
}

/// Build a certificate chain in PEM format, leaf first.
///
/// # Example
///
/// ```
/// use detcert::cert::builder::ValidityWindow;
/// use detcert::cert::ca::create_root_ca;
/// use detcert::cert::entity::build_cert_chain_pem;
/// use detcert::crypto::aes_random::AesRandom;
///
/// # fn example() -> detcert::error::Result<()> {
/// let mut rng = AesRandom::from_phrase("doc example");
/// let root = create_root_ca(&mut rng, "CN=Root CA", 1, &ValidityWindow::fixture()?)?;
/// let chain = build_cert_chain_pem(&[&root.certificate])?;
/// assert!(chain.contains("BEGIN CERTIFICATE"));
/// # Ok(())
/// # }
/// ```
pub fn build_cert_chain_pem(certs: &[&Certificate]) -> Result<String> {
    let pems = certs
        .iter()
        .map(|cert| cert_to_pem(cert))
        .collect::<Result<Vec<_>>>()?;

    Ok(pems.join("\n"))
}
