//! Key pair generation, signing and verification.
//!
//! Root and intermediate CAs use RSA-2048; leaves use either RSA-2048 or
//! ECDSA P-256. Every operation that needs randomness takes the entropy source
//! as a parameter, so the deterministic generator can be injected.

use crate::error::{DetCertError, Result};
use const_oid::ObjectIdentifier;
use der::asn1::Any;
use der::{Decode, Encode, Tag};
use p256::ecdsa::{DerSignature, SigningKey as EcdsaSigningKey, VerifyingKey as EcdsaVerifyingKey};
use rand::{CryptoRng, RngCore};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use spki::{
    AlgorithmIdentifierOwned, DecodePublicKey, EncodePublicKey, SubjectPublicKeyInfoOwned,
};

/// rsaEncryption (1.2.840.113549.1.1.1)
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// id-ecPublicKey (1.2.840.10045.2.1)
pub const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// sha256WithRSAEncryption (1.2.840.113549.1.1.11)
pub const SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
/// ecdsa-with-SHA256 (1.2.840.10045.4.3.2)
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

const RSA_BITS: usize = 2048;

/// Supported key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa2048,
    EcdsaP256,
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyAlgorithm::Rsa2048 => write!(f, "RSA-2048"),
            KeyAlgorithm::EcdsaP256 => write!(f, "ECDSA-P256"),
        }
    }
}

/// A private key together with its algorithm.
#[derive(Clone)]
pub enum KeyPair {
    Rsa(RsaPrivateKey),
    Ecdsa(p256::SecretKey),
}

impl KeyPair {
    /// Generate a fresh key pair, drawing all randomness from `rng`.
    ///
    /// # Example
    ///
    /// ```
    /// use detcert::crypto::aes_random::AesRandom;
    /// use detcert::crypto::keys::{KeyAlgorithm, KeyPair};
    ///
    /// let mut rng = AesRandom::from_phrase("example");
    /// let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
    /// assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaP256);
    /// ```
    pub fn generate<R: RngCore + CryptoRng>(algorithm: KeyAlgorithm, rng: &mut R) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Rsa2048 => RsaPrivateKey::new(rng, RSA_BITS)
                .map(KeyPair::Rsa)
                .map_err(|e| {
                    DetCertError::KeyGenerationError(format!("RSA key generation failed: {}", e))
                }),
            KeyAlgorithm::EcdsaP256 => Ok(KeyPair::Ecdsa(p256::SecretKey::random(rng))),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa(_) => KeyAlgorithm::Rsa2048,
            KeyPair::Ecdsa(_) => KeyAlgorithm::EcdsaP256,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
            KeyPair::Ecdsa(key) => PublicKey::Ecdsa(key.public_key()),
        }
    }

    /// SubjectPublicKeyInfo for embedding in a certificate.
    pub fn public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }

    /// Algorithm identifier for signatures made with this key.
    pub fn signature_algorithm(&self) -> Result<AlgorithmIdentifierOwned> {
        match self {
            KeyPair::Rsa(_) => {
                let null = Any::new(Tag::Null, Vec::<u8>::new()).map_err(|e| {
                    DetCertError::CryptoError(format!("Failed to encode NULL parameters: {}", e))
                })?;
                Ok(AlgorithmIdentifierOwned {
                    oid: SHA256_WITH_RSA,
                    parameters: Some(null),
                })
            }
            KeyPair::Ecdsa(_) => Ok(AlgorithmIdentifierOwned {
                oid: ECDSA_WITH_SHA256,
                parameters: None,
            }),
        }
    }

    /// Sign `message` with SHA-256.
    ///
    /// RSA uses PKCS#1 v1.5 with blinding drawn from `rng`. ECDSA mixes `rng`
    /// output into the RFC 6979 nonce and returns a DER-encoded signature.
    pub fn sign<R: RngCore + CryptoRng>(&self, rng: &mut R, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa(key) => {
                let signing_key = RsaSigningKey::<Sha256>::new(key.clone());
                let signature = signing_key.try_sign_with_rng(rng, message).map_err(|e| {
                    DetCertError::CryptoError(format!("RSA signing failed: {}", e))
                })?;
                Ok(signature.to_vec())
            }
            KeyPair::Ecdsa(key) => {
                let signing_key = EcdsaSigningKey::from(key);
                let signature: DerSignature =
                    signing_key.try_sign_with_rng(rng, message).map_err(|e| {
                        DetCertError::CryptoError(format!("ECDSA signing failed: {}", e))
                    })?;
                Ok(signature.to_vec())
            }
        }
    }

    /// Raw private key DER: PKCS#1 for RSA, SEC1 for EC.
    pub fn private_key_der(&self) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa(key) => key
                .to_pkcs1_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| {
                    DetCertError::CryptoError(format!("Failed to encode RSA private key: {}", e))
                }),
            KeyPair::Ecdsa(key) => key
                .to_sec1_der()
                .map(|der| der.to_vec())
                .map_err(|e| {
                    DetCertError::CryptoError(format!("Failed to encode EC private key: {}", e))
                }),
        }
    }

    /// PEM label matching [`KeyPair::private_key_der`].
    pub fn pem_label(&self) -> &'static str {
        match self {
            KeyPair::Rsa(_) => "RSA PRIVATE KEY",
            KeyPair::Ecdsa(_) => "EC PRIVATE KEY",
        }
    }

    pub fn private_key_pem(&self) -> Result<String> {
        let der = self.private_key_der()?;
        Ok(pem::encode(&pem::Pem::new(self.pem_label(), der)))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// A public key recovered from a key pair or a certificate.
#[derive(Debug, Clone, PartialEq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Ecdsa(p256::PublicKey),
}

impl PublicKey {
    /// Decode a SubjectPublicKeyInfo, dispatching on its algorithm OID.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki
            .to_der()
            .map_err(|e| DetCertError::CryptoError(format!("Failed to encode SPKI: {}", e)))?;

        let oid = spki.algorithm.oid;
        if oid == RSA_ENCRYPTION {
            RsaPublicKey::from_public_key_der(&der)
                .map(PublicKey::Rsa)
                .map_err(|e| DetCertError::CryptoError(format!("Invalid RSA public key: {}", e)))
        } else if oid == EC_PUBLIC_KEY {
            p256::PublicKey::from_public_key_der(&der)
                .map(PublicKey::Ecdsa)
                .map_err(|e| DetCertError::CryptoError(format!("Invalid EC public key: {}", e)))
        } else {
            Err(DetCertError::CryptoError(format!(
                "Unsupported public key algorithm: {}",
                oid
            )))
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::Ecdsa(key) => key.to_public_key_der(),
        }
        .map_err(|e| DetCertError::CryptoError(format!("Failed to encode public key: {}", e)))?;

        SubjectPublicKeyInfoOwned::from_der(document.as_bytes())
            .map_err(|e| DetCertError::CryptoError(format!("Failed to decode SPKI: {}", e)))
    }

    /// Verify a SHA-256 signature made by [`KeyPair::sign`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let failed = |e: rsa::signature::Error| {
            DetCertError::CryptoError(format!("Signature verification failed: {}", e))
        };

        match self {
            PublicKey::Rsa(key) => {
                let signature = RsaSignature::try_from(signature).map_err(failed)?;
                RsaVerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(failed)
            }
            PublicKey::Ecdsa(key) => {
                let signature = DerSignature::try_from(signature).map_err(failed)?;
                EcdsaVerifyingKey::from(key)
                    .verify(message, &signature)
                    .map_err(failed)
            }
        }
    }

    /// The signature algorithm OID this key verifies.
    pub fn signature_oid(&self) -> ObjectIdentifier {
        match self {
            PublicKey::Rsa(_) => SHA256_WITH_RSA,
            PublicKey::Ecdsa(_) => ECDSA_WITH_SHA256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aes_random::AesRandom;

    fn rng() -> AesRandom {
        AesRandom::from_phrase("keys module tests")
    }

    #[test]
    fn test_generate_rsa_key() {
        let key = KeyPair::generate(KeyAlgorithm::Rsa2048, &mut rng()).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Rsa2048);
        match key {
            KeyPair::Rsa(ref k) => {
                use rsa::traits::PublicKeyParts;
                assert_eq!(k.size(), 256);
            }
            _ => panic!("expected RSA key"),
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng()).unwrap();
        let b = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng()).unwrap();
        assert_eq!(a.private_key_der().unwrap(), b.private_key_der().unwrap());
    }

    #[test]
    fn test_different_seeds_give_different_keys() {
        let a = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng()).unwrap();
        let mut other = AesRandom::from_phrase("another phrase");
        let b = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut other).unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_rsa_sign_and_verify() {
        let mut rng = rng();
        let key = KeyPair::generate(KeyAlgorithm::Rsa2048, &mut rng).unwrap();
        let signature = key.sign(&mut rng, b"message").unwrap();
        assert_eq!(signature.len(), 256);

        let public = key.public_key();
        assert!(public.verify(b"message", &signature).is_ok());
        assert!(public.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn test_ecdsa_sign_and_verify() {
        let mut rng = rng();
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let signature = key.sign(&mut rng, b"message").unwrap();
        // DER SEQUENCE of two INTEGERs
        assert_eq!(signature[0], 0x30);

        let public = key.public_key();
        assert!(public.verify(b"message", &signature).is_ok());
        assert!(public.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn test_ecdsa_signature_depends_on_rng_state() {
        let mut rng = rng();
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();
        let first = key.sign(&mut rng, b"message").unwrap();
        let second = key.sign(&mut rng, b"message").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_spki_round_trip() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng()).unwrap();
        let spki = key.public_key_info().unwrap();
        assert_eq!(spki.algorithm.oid, EC_PUBLIC_KEY);
        assert_eq!(PublicKey::from_spki(&spki).unwrap(), key.public_key());
    }

    #[test]
    fn test_signature_algorithms() {
        let mut rng = rng();
        let rsa_key = KeyPair::generate(KeyAlgorithm::Rsa2048, &mut rng).unwrap();
        let ec_key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();

        let rsa_alg = rsa_key.signature_algorithm().unwrap();
        assert_eq!(rsa_alg.oid, SHA256_WITH_RSA);
        assert!(rsa_alg.parameters.is_some());

        let ec_alg = ec_key.signature_algorithm().unwrap();
        assert_eq!(ec_alg.oid, ECDSA_WITH_SHA256);
        assert!(ec_alg.parameters.is_none());
    }

    #[test]
    fn test_private_key_pem_labels() {
        let mut rng = rng();
        let rsa_key = KeyPair::generate(KeyAlgorithm::Rsa2048, &mut rng).unwrap();
        let ec_key = KeyPair::generate(KeyAlgorithm::EcdsaP256, &mut rng).unwrap();

        let rsa_pem = rsa_key.private_key_pem().unwrap();
        assert!(rsa_pem.contains("BEGIN RSA PRIVATE KEY"));

        let ec_pem = ec_key.private_key_pem().unwrap();
        assert!(ec_pem.contains("BEGIN EC PRIVATE KEY"));
    }
}
