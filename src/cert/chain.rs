//! The fixture certificate chain.
//!
//! Four issuances, strictly in order, all drawing from one entropy source:
//!
//! | serial | subject          | issuer       | key        | CA  |
//! |--------|------------------|--------------|------------|-----|
//! | 1      | Root CA          | self         | RSA-2048   | yes |
//! | 2      | Intermediate CA  | Root CA      | RSA-2048   | yes |
//! | 3      | test.example.com | Intermediate | RSA-2048   | no  |
//! | 4      | test.example.com | Intermediate | ECDSA-P256 | no  |
//!
//! The order of key generation and signing fixes which generator bytes each
//! step consumes, so it must not change.

use crate::cert::builder::{serial_number, ValidityWindow};
use crate::cert::ca::create_root_ca;
use crate::cert::entity::create_end_entity_cert;
use crate::cert::intermediate::create_intermediate_ca;
use crate::cert::x509_signing::{verify_certificate, IssuedCertificate};
use crate::crypto::keys::KeyAlgorithm;
use crate::error::{DetCertError, Result};
use der::Decode;
use rand::{CryptoRng, RngCore};
use x509_cert::certificate::Certificate;
use x509_cert::ext::pkix::BasicConstraints;

pub const ROOT_SUBJECT: &str = "O=Acme Co,CN=Root CA";
pub const INTERMEDIATE_SUBJECT: &str = "O=Acme Co,CN=Intermediate CA";
pub const LEAF_SUBJECT: &str = "O=Acme Co,CN=test.example.com";
pub const LEAF_DNS_NAME: &str = "test.example.com";

pub const ROOT_SERIAL: u64 = 1;
pub const INTERMEDIATE_SERIAL: u64 = 2;
pub const RSA_LEAF_SERIAL: u64 = 3;
pub const ECDSA_LEAF_SERIAL: u64 = 4;

/// The four issued certificates and their keys.
#[derive(Debug, Clone)]
pub struct FixtureChain {
    pub root: IssuedCertificate,
    pub intermediate: IssuedCertificate,
    pub rsa_leaf: IssuedCertificate,
    pub ecdsa_leaf: IssuedCertificate,
}

/// Role of a certificate within the fixture chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureRole {
    Root = 0,
    Intermediate = 1,
    RsaLeaf = 2,
    EcdsaLeaf = 3,
}

impl FixtureRole {
    /// Every role, in issuance order.
    pub const ALL: [FixtureRole; 4] = [
        FixtureRole::Root,
        FixtureRole::Intermediate,
        FixtureRole::RsaLeaf,
        FixtureRole::EcdsaLeaf,
    ];

    /// Base name of the files written for this role.
    pub fn file_stem(self) -> &'static str {
        match self {
            FixtureRole::Root => "root",
            FixtureRole::Intermediate => "intermediate",
            FixtureRole::RsaLeaf => "test.example.com",
            FixtureRole::EcdsaLeaf => "test_ecc.example.com",
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, FixtureRole::RsaLeaf | FixtureRole::EcdsaLeaf)
    }

    pub fn serial(self) -> u64 {
        match self {
            FixtureRole::Root => ROOT_SERIAL,
            FixtureRole::Intermediate => INTERMEDIATE_SERIAL,
            FixtureRole::RsaLeaf => RSA_LEAF_SERIAL,
            FixtureRole::EcdsaLeaf => ECDSA_LEAF_SERIAL,
        }
    }

    /// The role whose key signs this role's certificate.
    pub fn issuer(self) -> FixtureRole {
        match self {
            FixtureRole::Root | FixtureRole::Intermediate => FixtureRole::Root,
            FixtureRole::RsaLeaf | FixtureRole::EcdsaLeaf => FixtureRole::Intermediate,
        }
    }
}

impl FixtureChain {
    /// Issue the full chain with the fixed validity window.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use detcert::cert::chain::FixtureChain;
    /// use detcert::crypto::aes_random::{AesRandom, DEFAULT_SEED_PHRASE};
    ///
    /// # fn example() -> detcert::error::Result<()> {
    /// let mut rng = AesRandom::from_phrase(DEFAULT_SEED_PHRASE);
    /// let chain = FixtureChain::generate(&mut rng)?;
    /// chain.verify()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let validity = ValidityWindow::fixture()?;
        Self::generate_with_validity(rng, &validity)
    }

    fn generate_with_validity<R: RngCore + CryptoRng>(
        rng: &mut R,
        validity: &ValidityWindow,
    ) -> Result<Self> {
        let dns_names = [LEAF_DNS_NAME.to_string()];

        let root = create_root_ca(rng, ROOT_SUBJECT, ROOT_SERIAL, validity)?;
        let intermediate =
            create_intermediate_ca(rng, &root, INTERMEDIATE_SUBJECT, INTERMEDIATE_SERIAL, validity)?;
        let rsa_leaf = create_end_entity_cert(
            rng,
            &intermediate,
            KeyAlgorithm::Rsa2048,
            LEAF_SUBJECT,
            &dns_names,
            RSA_LEAF_SERIAL,
            validity,
        )?;
        let ecdsa_leaf = create_end_entity_cert(
            rng,
            &intermediate,
            KeyAlgorithm::EcdsaP256,
            LEAF_SUBJECT,
            &dns_names,
            ECDSA_LEAF_SERIAL,
            validity,
        )?;

        Ok(Self {
            root,
            intermediate,
            rsa_leaf,
            ecdsa_leaf,
        })
    }

    pub fn get(&self, role: FixtureRole) -> &IssuedCertificate {
        match role {
            FixtureRole::Root => &self.root,
            FixtureRole::Intermediate => &self.intermediate,
            FixtureRole::RsaLeaf => &self.rsa_leaf,
            FixtureRole::EcdsaLeaf => &self.ecdsa_leaf,
        }
    }

    /// Iterate over `(role, certificate)` in issuance order.
    pub fn iter(&self) -> impl Iterator<Item = (FixtureRole, &IssuedCertificate)> {
        FixtureRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }

    /// Check every signature against its issuer's public key, along with
    /// serials, issuer names and CA flags.
    pub fn verify(&self) -> Result<()> {
        verify_chain_certificates([
            &self.root.certificate,
            &self.intermediate.certificate,
            &self.rsa_leaf.certificate,
            &self.ecdsa_leaf.certificate,
        ])
    }
}

/// Verify four certificates given in issuance order.
///
/// Only public material is needed, so this works on certificates read back
/// from disk.
pub fn verify_chain_certificates(certs: [&Certificate; 4]) -> Result<()> {
    for (role, cert) in FixtureRole::ALL.into_iter().zip(certs) {
        let issuer = certs[role.issuer() as usize];
        let tbs = &cert.tbs_certificate;

        if tbs.serial_number != serial_number(role.serial())? {
            return Err(DetCertError::CertificateError(format!(
                "{} has serial {}, expected {}",
                role.file_stem(),
                tbs.serial_number,
                role.serial()
            )));
        }

        if tbs.issuer != issuer.tbs_certificate.subject {
            return Err(DetCertError::CertificateError(format!(
                "{} is not issued by {}",
                role.file_stem(),
                role.issuer().file_stem()
            )));
        }

        if is_ca(cert)? == role.is_leaf() {
            return Err(DetCertError::CertificateError(format!(
                "{} has the wrong CA flag",
                role.file_stem()
            )));
        }

        verify_certificate(cert, &issuer.tbs_certificate.subject_public_key_info).map_err(|e| {
            DetCertError::CertificateError(format!("{}: {}", role.file_stem(), e))
        })?;
    }
    Ok(())
}

fn is_ca(cert: &Certificate) -> Result<bool> {
    let ext = cert
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|ext| ext.extn_id == const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS);

    match ext {
        Some(ext) => BasicConstraints::from_der(ext.extn_value.as_bytes())
            .map(|bc| bc.ca)
            .map_err(|e| {
                DetCertError::CertificateError(format!("Invalid basic constraints: {}", e))
            }),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_in_issuance_order() {
        let serials: Vec<u64> = FixtureRole::ALL.iter().map(|r| r.serial()).collect();
        assert_eq!(serials, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_role_issuers() {
        assert_eq!(FixtureRole::Root.issuer(), FixtureRole::Root);
        assert_eq!(FixtureRole::Intermediate.issuer(), FixtureRole::Root);
        assert_eq!(FixtureRole::RsaLeaf.issuer(), FixtureRole::Intermediate);
        assert_eq!(FixtureRole::EcdsaLeaf.issuer(), FixtureRole::Intermediate);
    }

    #[test]
    fn test_file_stems_are_unique() {
        let mut stems: Vec<_> = FixtureRole::ALL.iter().map(|r| r.file_stem()).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), 4);
    }

    #[test]
    fn test_role_discriminants_match_issuance_order() {
        for (i, role) in FixtureRole::ALL.iter().enumerate() {
            assert_eq!(*role as usize, i);
        }
    }

    #[test]
    fn test_leaf_roles() {
        assert!(!FixtureRole::Root.is_leaf());
        assert!(!FixtureRole::Intermediate.is_leaf());
        assert!(FixtureRole::RsaLeaf.is_leaf());
        assert!(FixtureRole::EcdsaLeaf.is_leaf());
    }
}
