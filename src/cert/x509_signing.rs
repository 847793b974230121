//! X.509 certificate signing using x509-cert.
//!
//! A certificate description is turned into a TBS certificate and signed with
//! the issuer's key. Any randomness the signature scheme needs comes from the
//! caller's entropy source.

use crate::cert::builder::{build_extensions, parse_subject, serial_number, CertificateDescription};
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::error::{DetCertError, Result};
use der::asn1::BitString;
use der::{Decode, Encode};
use rand::{CryptoRng, RngCore};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::certificate::Certificate;
use x509_cert::name::Name;
use x509_cert::TbsCertificate;

/// The signing side of an issuance: the issuer's name and private key.
#[derive(Debug, Clone, Copy)]
pub struct Issuer<'a> {
    pub name: &'a Name,
    pub key: &'a KeyPair,
}

/// A signed certificate together with the key pair it certifies.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub certificate: Certificate,
    pub key_pair: KeyPair,
}

impl IssuedCertificate {
    /// Borrow this certificate's subject and key to sign children.
    pub fn as_issuer(&self) -> Issuer<'_> {
        Issuer {
            name: &self.certificate.tbs_certificate.subject,
            key: &self.key_pair,
        }
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        cert_to_der(&self.certificate)
    }

    pub fn to_pem(&self) -> Result<String> {
        cert_to_pem(&self.certificate)
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.certificate.tbs_certificate.subject_public_key_info
    }
}

/// Build and sign a certificate for `subject_key`.
///
/// With `issuer` set to `None` the certificate is self-signed: the issuer name
/// is the subject name and `subject_key` signs it.
///
/// # Example
///
/// ```
/// use detcert::cert::builder::{CertificateDescription, ValidityWindow, SERVER_AUTH};
/// use detcert::cert::x509_signing::{sign_certificate, verify_certificate};
/// use detcert::crypto::aes_random::AesRandom;
/// use detcert::crypto::keys::{KeyAlgorithm, KeyPair};
/// use x509_cert::ext::pkix::{KeyUsage, KeyUsages};
///
/// # fn example() -> detcert::error::Result<()> {
/// let mut rng = AesRandom::from_phrase("doc example");
/// let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng)?;
/// let desc = CertificateDescription {
///     serial: 1,
///     subject: "O=Example,CN=Example CA".to_string(),
///     validity: ValidityWindow::fixture()?,
///     key_usage: KeyUsage(KeyUsages::KeyCertSign.into()),
///     extended_key_usage: vec![SERVER_AUTH],
///     is_ca: true,
///     dns_names: Vec::new(),
/// };
///
/// let cert = sign_certificate(&desc, &key, None, &mut rng)?;
/// verify_certificate(&cert, &cert.tbs_certificate.subject_public_key_info)?;
/// # Ok(())
/// # }
/// ```
pub fn sign_certificate<R: RngCore + CryptoRng>(
    desc: &CertificateDescription,
    subject_key: &KeyPair,
    issuer: Option<Issuer<'_>>,
    rng: &mut R,
) -> Result<Certificate> {
    let subject = parse_subject(&desc.subject)?;
    let spki = subject_key.public_key_info()?;

    let (issuer_name, signing_key, issuer_spki) = match issuer {
        Some(issuer) => (
            issuer.name.clone(),
            issuer.key,
            Some(issuer.key.public_key_info()?),
        ),
        None => (subject.clone(), subject_key, None),
    };

    let extensions = build_extensions(desc, &subject, &spki, issuer_spki.as_ref())?;
    let signature_algorithm = signing_key.signature_algorithm()?;

    let tbs = TbsCertificate {
        version: x509_cert::certificate::Version::V3,
        serial_number: serial_number(desc.serial)?,
        signature: signature_algorithm.clone(),
        issuer: issuer_name,
        validity: desc.validity.to_validity()?,
        subject,
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };

    let signature = sign_tbs(&tbs, signing_key, rng)?;

    Ok(Certificate {
        tbs_certificate: tbs,
        signature_algorithm,
        signature,
    })
}

/// Check that `cert` was signed by the key in `issuer_spki`.
pub fn verify_certificate(cert: &Certificate, issuer_spki: &SubjectPublicKeyInfoOwned) -> Result<()> {
    let public_key = PublicKey::from_spki(issuer_spki)?;

    if cert.signature_algorithm.oid != public_key.signature_oid() {
        return Err(DetCertError::CertificateError(format!(
            "Signature algorithm {} does not match issuer key",
            cert.signature_algorithm.oid
        )));
    }

    let tbs_der = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| DetCertError::CertificateError(format!("Failed to encode TBS: {}", e)))?;

    public_key.verify(&tbs_der, cert.signature.raw_bytes())
}

/// Encode a Certificate to DER.
pub fn cert_to_der(cert: &Certificate) -> Result<Vec<u8>> {
    cert.to_der()
        .map_err(|e| DetCertError::CertificateError(format!("Failed to encode certificate: {}", e)))
}

/// Convert a Certificate to PEM format.
pub fn cert_to_pem(cert: &Certificate) -> Result<String> {
    let der = cert_to_der(cert)?;
    Ok(pem::encode(&pem::Pem::new("CERTIFICATE", der)))
}

/// Load a Certificate from PEM format.
pub fn cert_from_pem(pem_str: &str) -> Result<Certificate> {
    let pem = pem::parse(pem_str)
        .map_err(|e| DetCertError::PemError(format!("Failed to parse PEM: {}", e)))?;

    if pem.tag() != "CERTIFICATE" {
        return Err(DetCertError::PemError(format!(
            "Expected CERTIFICATE, got {}",
            pem.tag()
        )));
    }

    cert_from_der(pem.contents())
}

/// Decode a Certificate from DER.
pub fn cert_from_der(der: &[u8]) -> Result<Certificate> {
    Certificate::from_der(der)
        .map_err(|e| DetCertError::CertificateError(format!("Failed to decode certificate: {}", e)))
}

fn sign_tbs<R: RngCore + CryptoRng>(
    tbs: &TbsCertificate,
    signing_key: &KeyPair,
    rng: &mut R,
) -> Result<BitString> {
    let tbs_der = tbs
        .to_der()
        .map_err(|e| DetCertError::CertificateError(format!("Failed to encode TBS: {}", e)))?;

    let signature = signing_key.sign(rng, &tbs_der)?;

    BitString::from_bytes(&signature).map_err(|e| {
        DetCertError::CertificateError(format!("Failed to create signature bitstring: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::builder::{ValidityWindow, SERVER_AUTH};
    use crate::crypto::aes_random::AesRandom;
    use crate::crypto::keys::KeyAlgorithm;
    use x509_cert::ext::pkix::{KeyUsage, KeyUsages};

    fn description(serial: u64, subject: &str, is_ca: bool) -> CertificateDescription {
        CertificateDescription {
            serial,
            subject: subject.to_string(),
            validity: ValidityWindow::fixture().unwrap(),
            key_usage: if is_ca {
                KeyUsage(KeyUsages::KeyCertSign.into())
            } else {
                KeyUsage(KeyUsages::DigitalSignature.into())
            },
            extended_key_usage: vec![SERVER_AUTH],
            is_ca,
            dns_names: Vec::new(),
        }
    }

    #[test]
    fn test_self_signed_certificate() {
        let mut rng = AesRandom::from_phrase("signing tests");
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let cert = sign_certificate(&description(1, "CN=Test CA", true), &key, None, &mut rng)
            .unwrap();

        assert_eq!(cert.tbs_certificate.issuer, cert.tbs_certificate.subject);
        assert_eq!(cert.tbs_certificate.version, x509_cert::certificate::Version::V3);
        assert!(verify_certificate(&cert, &cert.tbs_certificate.subject_public_key_info).is_ok());
    }

    #[test]
    fn test_issued_certificate_links_to_issuer() {
        let mut rng = AesRandom::from_phrase("signing tests");
        let ca_key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let ca_cert =
            sign_certificate(&description(1, "CN=Test CA", true), &ca_key, None, &mut rng).unwrap();

        let leaf_key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let issuer = Issuer {
            name: &ca_cert.tbs_certificate.subject,
            key: &ca_key,
        };
        let leaf_cert = sign_certificate(
            &description(2, "CN=leaf.example", false),
            &leaf_key,
            Some(issuer),
            &mut rng,
        )
        .unwrap();

        assert_eq!(leaf_cert.tbs_certificate.issuer, ca_cert.tbs_certificate.subject);
        let ca_spki = &ca_cert.tbs_certificate.subject_public_key_info;
        assert!(verify_certificate(&leaf_cert, ca_spki).is_ok());

        // The leaf's own key did not sign it.
        let leaf_spki = &leaf_cert.tbs_certificate.subject_public_key_info;
        assert!(verify_certificate(&leaf_cert, leaf_spki).is_err());
    }

    #[test]
    fn test_verify_rejects_mismatched_key_type() {
        let mut rng = AesRandom::from_phrase("signing tests");
        let ec_key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let rsa_key = KeyPair::generate(KeyAlgorithm::Rsa2048, &mut rng).unwrap();
        let cert =
            sign_certificate(&description(1, "CN=Test CA", true), &ec_key, None, &mut rng).unwrap();

        let rsa_spki = rsa_key.public_key_info().unwrap();
        assert!(matches!(
            verify_certificate(&cert, &rsa_spki),
            Err(DetCertError::CertificateError(_))
        ));
    }

    #[test]
    fn test_cert_pem_roundtrip() {
        let mut rng = AesRandom::from_phrase("signing tests");
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let cert = sign_certificate(&description(3, "CN=Test CA", true), &key, None, &mut rng)
            .unwrap();

        let pem = cert_to_pem(&cert).unwrap();
        assert!(pem.contains("BEGIN CERTIFICATE"));
        let loaded = cert_from_pem(&pem).unwrap();
        assert_eq!(loaded, cert);
    }

    #[test]
    fn test_cert_from_pem_wrong_tag() {
        let pem = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]));
        assert!(matches!(cert_from_pem(&pem), Err(DetCertError::PemError(_))));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let build = || {
            let mut rng = AesRandom::from_phrase("signing tests");
            let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
            let cert =
                sign_certificate(&description(1, "CN=Test CA", true), &key, None, &mut rng)
                    .unwrap();
            cert_to_der(&cert).unwrap()
        };
        assert_eq!(build(), build());
    }
}
