//! Certificate loading from PEM files.
//!
//! Fixture certificate files are `openssl x509 -text` dumps: a human-readable
//! description followed by the PEM block. Text outside PEM sections is skipped.

use crate::cert::x509_signing::cert_from_der;
use crate::error::{DetCertError, Result};
use rustls_pemfile::Item;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use x509_cert::certificate::Certificate;

/// Load the first certificate in a PEM string as DER.
///
/// # Arguments
///
/// * `pem_str` - PEM-encoded certificate string
///
/// # Example
///
/// ```rust,no_run
/// use detcert::cert::loader::load_certificate_from_pem;
///
/// # fn example() -> detcert::error::Result<()> {
/// let pem = std::fs::read_to_string("root.crt")?;
/// let der = load_certificate_from_pem(&pem)?;
/// # Ok(())
/// # }
/// ```
pub fn load_certificate_from_pem(pem_str: &str) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(pem_str.as_bytes());

    loop {
        match rustls_pemfile::read_one(&mut cursor)
            .map_err(|e| DetCertError::PemError(format!("Failed to read PEM: {}", e)))?
        {
            Some(Item::X509Certificate(cert_der)) => return Ok(cert_der.to_vec()),
            Some(_) => continue,
            None => {
                return Err(DetCertError::PemError(
                    "PEM file does not contain a certificate".to_string(),
                ))
            }
        }
    }
}

/// Load every certificate in a PEM string as DER.
///
/// # Example
///
/// ```rust,no_run
/// use detcert::cert::loader::load_certificates_from_pem;
///
/// # fn example() -> detcert::error::Result<()> {
/// let pem = std::fs::read_to_string("chain.pem")?;
/// let certs = load_certificates_from_pem(&pem)?;
/// println!("Loaded {} certificates", certs.len());
/// # Ok(())
/// # }
/// ```
pub fn load_certificates_from_pem(pem_str: &str) -> Result<Vec<Vec<u8>>> {
    let mut cursor = Cursor::new(pem_str.as_bytes());
    let mut certificates = Vec::new();

    loop {
        match rustls_pemfile::read_one(&mut cursor)
            .map_err(|e| DetCertError::PemError(format!("Failed to read PEM: {}", e)))?
        {
            Some(Item::X509Certificate(cert_der)) => {
                certificates.push(cert_der.to_vec());
            }
            Some(_) => {
                // Skip non-certificate items
                continue;
            }
            None => break,
        }
    }

    if certificates.is_empty() {
        return Err(DetCertError::PemError(
            "No certificates found in PEM file".to_string(),
        ));
    }

    Ok(certificates)
}

/// Read and decode the first certificate in the file at `path`.
pub fn load_certificate_file(path: &Path) -> Result<Certificate> {
    let contents = fs::read_to_string(path)?;
    let der = load_certificate_from_pem(&contents).map_err(|e| {
        DetCertError::PemError(format!("{}: {}", path.display(), e))
    })?;
    cert_from_der(&der)
}
