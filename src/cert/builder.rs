//! Certificate builder utilities.
//!
//! This module provides the pieces a certificate description is assembled from:
//! subject names, the validity window, serial numbers and extensions.

use crate::error::{DetCertError, Result};
use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use der::asn1::{Ia5String, OctetString, SetOfVec, UtcTime, Utf8StringRef};
use der::Encode;
use sha1::{Digest, Sha1};
use std::time::Duration;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier,
};
use x509_cert::ext::{AsExtension, Extension};
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};

/// Start of the fixture validity window.
pub const NOT_BEFORE: &str = "2013-01-01T10:00:00Z";
/// End of the fixture validity window.
pub const NOT_AFTER: &str = "2023-12-31T10:00:00Z";

/// id-kp-serverAuth (1.3.6.1.5.5.7.3.1)
pub const SERVER_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.1");

/// Everything needed to issue one certificate, apart from the keys.
#[derive(Debug, Clone)]
pub struct CertificateDescription {
    pub serial: u64,
    /// Subject in "O=Acme Co,CN=Root CA" form.
    pub subject: String,
    pub validity: ValidityWindow,
    pub key_usage: KeyUsage,
    pub extended_key_usage: Vec<ObjectIdentifier>,
    pub is_ca: bool,
    pub dns_names: Vec<String>,
}

/// A notBefore/notAfter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl ValidityWindow {
    /// Parse both instants from RFC 3339 text.
    ///
    /// # Example
    ///
    /// ```
    /// use detcert::cert::builder::ValidityWindow;
    ///
    /// let window = ValidityWindow::parse("2013-01-01T10:00:00Z", "2023-12-31T10:00:00Z").unwrap();
    /// assert!(window.not_before < window.not_after);
    /// assert!(ValidityWindow::parse("yesterday", "tomorrow").is_err());
    /// ```
    pub fn parse(not_before: &str, not_after: &str) -> Result<Self> {
        let not_before = parse_instant(not_before)?;
        let not_after = parse_instant(not_after)?;

        if not_after <= not_before {
            return Err(DetCertError::TimeParseError(format!(
                "notAfter {} is not later than notBefore {}",
                not_after, not_before
            )));
        }

        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// The fixed window shared by every fixture certificate.
    pub fn fixture() -> Result<Self> {
        Self::parse(NOT_BEFORE, NOT_AFTER)
    }

    pub fn to_validity(&self) -> Result<Validity> {
        Ok(Validity {
            not_before: to_time(&self.not_before)?,
            not_after: to_time(&self.not_after)?,
        })
    }
}

/// Parse a single RFC 3339 instant, normalized to UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DetCertError::TimeParseError(format!("Invalid instant '{}': {}", text, e)))
}

fn to_time(instant: &DateTime<Utc>) -> Result<Time> {
    let secs = u64::try_from(instant.timestamp()).map_err(|_| {
        DetCertError::TimeParseError(format!("Instant before the Unix epoch: {}", instant))
    })?;

    UtcTime::from_unix_duration(Duration::from_secs(secs))
        .map(Time::UtcTime)
        .map_err(|e| DetCertError::CertificateError(format!("Failed to encode time: {}", e)))
}

/// Parse a subject string (e.g., "O=Example Org,CN=example.com") into a Name.
///
/// Attributes keep their order; each becomes its own RDN.
///
/// # Example
///
/// ```
/// use detcert::cert::builder::parse_subject;
///
/// let name = parse_subject("O=Acme Co,CN=Root CA").unwrap();
/// assert_eq!(name.0.len(), 2);
/// ```
pub fn parse_subject(subject: &str) -> Result<Name> {
    let mut rdns = Vec::new();

    for part in subject.split(',') {
        let part = part.trim();
        let Some((key, value)) = part.split_once('=') else {
            return Err(DetCertError::ParseError(format!(
                "Invalid subject format: {}",
                part
            )));
        };
        let key = key.trim();
        let value = value.trim();

        let oid = match key.to_uppercase().as_str() {
            "CN" => const_oid::db::rfc4519::CN,
            "C" => const_oid::db::rfc4519::C,
            "O" => const_oid::db::rfc4519::O,
            "OU" => const_oid::db::rfc4519::OU,
            "ST" => const_oid::db::rfc4519::ST,
            "L" => const_oid::db::rfc4519::L,
            _ => return Err(DetCertError::ParseError(format!("Unknown DN type: {}", key))),
        };

        let attr = AttributeTypeAndValue {
            oid,
            value: Utf8StringRef::new(value)
                .map_err(|e| DetCertError::ParseError(format!("Invalid {} value: {}", key, e)))?
                .into(),
        };

        let mut attr_set = SetOfVec::new();
        attr_set.insert_ordered(attr).map_err(|e| {
            DetCertError::CertificateError(format!("Failed to add attribute: {}", e))
        })?;
        rdns.push(RelativeDistinguishedName::from(attr_set));
    }

    if rdns.is_empty() {
        return Err(DetCertError::ParseError(
            "Subject cannot be empty".to_string(),
        ));
    }

    Ok(RdnSequence(rdns))
}

/// Encode `serial` as a minimal positive INTEGER.
pub fn serial_number(serial: u64) -> Result<SerialNumber> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);

    let mut encoded = bytes[start..].to_vec();
    if encoded[0] & 0x80 != 0 {
        encoded.insert(0, 0);
    }

    SerialNumber::new(&encoded)
        .map_err(|e| DetCertError::CertificateError(format!("Invalid serial number: {}", e)))
}

/// SHA-1 over the subjectPublicKey bits (RFC 5280 method 1).
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Result<OctetString> {
    let hash = Sha1::digest(spki.subject_public_key.raw_bytes());
    OctetString::new(hash.to_vec())
        .map_err(|e| DetCertError::CertificateError(format!("Invalid key identifier: {}", e)))
}

/// Build the extension list for `desc`.
///
/// Order: KeyUsage, ExtendedKeyUsage, BasicConstraints, SubjectKeyIdentifier
/// (CAs only), AuthorityKeyIdentifier (when `issuer_spki` is given),
/// SubjectAltName (when DNS names are present).
pub fn build_extensions(
    desc: &CertificateDescription,
    subject: &Name,
    subject_spki: &SubjectPublicKeyInfoOwned,
    issuer_spki: Option<&SubjectPublicKeyInfoOwned>,
) -> Result<Vec<Extension>> {
    let encode_err =
        |e: der::Error| DetCertError::CertificateError(format!("Failed to encode extension: {}", e));
    let mut extensions = Vec::new();

    extensions.push(desc.key_usage.to_extension(subject, &extensions).map_err(encode_err)?);

    if !desc.extended_key_usage.is_empty() {
        // x509-cert marks EKU critical by default; fixtures carry it non-critical.
        let eku = ExtendedKeyUsage(desc.extended_key_usage.clone());
        extensions.push(Extension {
            extn_id: const_oid::db::rfc5280::ID_CE_EXT_KEY_USAGE,
            critical: false,
            extn_value: OctetString::new(eku.to_der().map_err(encode_err)?)
                .map_err(encode_err)?,
        });
    }

    let basic_constraints = BasicConstraints {
        ca: desc.is_ca,
        path_len_constraint: None,
    };
    extensions.push(
        basic_constraints
            .to_extension(subject, &extensions)
            .map_err(encode_err)?,
    );

    if desc.is_ca {
        let ski = SubjectKeyIdentifier(key_identifier(subject_spki)?);
        extensions.push(ski.to_extension(subject, &extensions).map_err(encode_err)?);
    }

    if let Some(issuer_spki) = issuer_spki {
        let aki = AuthorityKeyIdentifier {
            key_identifier: Some(key_identifier(issuer_spki)?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };
        extensions.push(aki.to_extension(subject, &extensions).map_err(encode_err)?);
    }

    if !desc.dns_names.is_empty() {
        let names = desc
            .dns_names
            .iter()
            .map(|name| {
                Ia5String::new(name.as_str())
                    .map(GeneralName::DnsName)
                    .map_err(|e| {
                        DetCertError::ParseError(format!("Invalid DNS name '{}': {}", name, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let san = SubjectAltName(names);
        extensions.push(san.to_extension(subject, &extensions).map_err(encode_err)?);
    }

    Ok(extensions)
}
