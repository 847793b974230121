//! Persisting a fixture chain to disk.
//!
//! For each role, in issuance order, the writer emits the private key PEM, the
//! encrypted key (leaf roles only), then the certificate dump.

use crate::cert::chain::{FixtureChain, FixtureRole};
use crate::cert::entity::build_cert_chain_pem;
use crate::cert::loader::{load_certificate_file, load_certificates_from_pem};
use crate::cert::x509_signing::cert_from_der;
use crate::error::{DetCertError, Result};
use crate::storage::external::{CertificateDumper, KeyEncryptor, DEFAULT_NONCE_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use x509_cert::certificate::Certificate;

/// Path of the PEM private key for `role`.
pub fn key_path(dir: &Path, role: FixtureRole) -> PathBuf {
    dir.join(format!("{}.key", role.file_stem()))
}

/// Path of the encrypted private key for `role`.
pub fn encrypted_key_path(dir: &Path, role: FixtureRole) -> PathBuf {
    dir.join(format!("{}.key.encrypted", role.file_stem()))
}

/// Path of the certificate dump for `role`.
pub fn cert_path(dir: &Path, role: FixtureRole) -> PathBuf {
    dir.join(format!("{}.crt", role.file_stem()))
}

/// Writes fixture files into one output directory.
pub struct FixtureWriter {
    out_dir: PathBuf,
    dumper: Box<dyn CertificateDumper>,
    encryptor: Option<Box<dyn KeyEncryptor>>,
    nonce_file: PathBuf,
}

impl FixtureWriter {
    /// Create a writer with no key encryptor.
    pub fn new(out_dir: impl Into<PathBuf>, dumper: Box<dyn CertificateDumper>) -> Self {
        Self {
            out_dir: out_dir.into(),
            dumper,
            encryptor: None,
            nonce_file: PathBuf::from(DEFAULT_NONCE_FILE),
        }
    }

    pub fn with_encryptor(mut self, encryptor: Box<dyn KeyEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Nonce file passed to the encryptor, used as given.
    pub fn with_nonce_file(mut self, nonce_file: impl Into<PathBuf>) -> Self {
        self.nonce_file = nonce_file.into();
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write every file for `chain` and return the paths in write order.
    ///
    /// The first failure aborts the run; files already written are left in
    /// place.
    pub fn write(&self, chain: &FixtureChain) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir)?;

        if self.encryptor.is_none() {
            log::warn!("No key encryptor configured, leaf keys will not be encrypted");
        }

        let mut written = Vec::new();
        for (role, issued) in chain.iter() {
            let key_file = key_path(&self.out_dir, role);
            fs::write(&key_file, issued.key_pair.private_key_pem()?)?;
            log::info!("Wrote {}", key_file.display());
            written.push(key_file.clone());

            if role.is_leaf() {
                if let Some(encryptor) = &self.encryptor {
                    let encrypted = encrypted_key_path(&self.out_dir, role);
                    encryptor.encrypt(&key_file, &self.nonce_file, &encrypted)?;
                    log::info!("Wrote {}", encrypted.display());
                    written.push(encrypted);
                }
            }

            let cert_file = cert_path(&self.out_dir, role);
            self.dumper.dump(&issued.to_der()?, &cert_file)?;
            log::info!("Wrote {}", cert_file.display());
            written.push(cert_file);
        }

        Ok(written)
    }
}

/// Read the four certificates back from `dir`, in issuance order.
pub fn load_fixture_certificates(dir: &Path) -> Result<[Certificate; 4]> {
    Ok([
        load_certificate_file(&cert_path(dir, FixtureRole::Root))?,
        load_certificate_file(&cert_path(dir, FixtureRole::Intermediate))?,
        load_certificate_file(&cert_path(dir, FixtureRole::RsaLeaf))?,
        load_certificate_file(&cert_path(dir, FixtureRole::EcdsaLeaf))?,
    ])
}

/// Write all four certificates as one PEM bundle, in issuance order.
pub fn write_chain_bundle(chain: &FixtureChain, path: &Path) -> Result<()> {
    let certs: Vec<_> = chain.iter().map(|(_, issued)| &issued.certificate).collect();
    fs::write(path, build_cert_chain_pem(&certs)?)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Read a bundle written by [`write_chain_bundle`].
pub fn load_chain_bundle(path: &Path) -> Result<[Certificate; 4]> {
    let contents = fs::read_to_string(path)?;
    let ders = load_certificates_from_pem(&contents)?;

    let [root, intermediate, rsa_leaf, ecdsa_leaf]: [Vec<u8>; 4] =
        ders.try_into().map_err(|ders: Vec<Vec<u8>>| {
            DetCertError::PemError(format!(
                "{}: expected 4 certificates, found {}",
                path.display(),
                ders.len()
            ))
        })?;

    Ok([
        cert_from_der(&root)?,
        cert_from_der(&intermediate)?,
        cert_from_der(&rsa_leaf)?,
        cert_from_der(&ecdsa_leaf)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let dir = Path::new("out");
        assert_eq!(key_path(dir, FixtureRole::Root), Path::new("out/root.key"));
        assert_eq!(
            cert_path(dir, FixtureRole::Intermediate),
            Path::new("out/intermediate.crt")
        );
        assert_eq!(
            encrypted_key_path(dir, FixtureRole::RsaLeaf),
            Path::new("out/test.example.com.key.encrypted")
        );
        assert_eq!(
            cert_path(dir, FixtureRole::EcdsaLeaf),
            Path::new("out/test_ecc.example.com.crt")
        );
    }

    #[test]
    fn test_load_chain_bundle_wrong_count() {
        use crate::cert::builder::{CertificateDescription, ValidityWindow, SERVER_AUTH};
        use crate::cert::x509_signing::{cert_to_pem, sign_certificate};
        use crate::crypto::aes_random::AesRandom;
        use crate::crypto::keys::{KeyAlgorithm, KeyPair};
        use x509_cert::ext::pkix::{KeyUsage, KeyUsages};

        let mut rng = AesRandom::from_phrase("bundle tests");
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let desc = CertificateDescription {
            serial: 1,
            subject: "CN=Lonely".to_string(),
            validity: ValidityWindow::fixture().unwrap(),
            key_usage: KeyUsage(KeyUsages::KeyCertSign.into()),
            extended_key_usage: vec![SERVER_AUTH],
            is_ca: true,
            dns_names: Vec::new(),
        };
        let cert = sign_certificate(&desc, &key, None, &mut rng).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chain.pem");
        fs::write(&path, cert_to_pem(&cert).unwrap()).unwrap();

        assert!(matches!(
            load_chain_bundle(&path),
            Err(DetCertError::PemError(_))
        ));
    }

    #[test]
    fn test_load_fixture_certificates_missing_dir() {
        assert!(load_fixture_certificates(Path::new("/nonexistent/detcert")).is_err());
    }
}
