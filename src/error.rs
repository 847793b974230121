//! Error types for the detcert library.
//!
//! Every error is fatal to a generation run: callers propagate with `?` and
//! the binary aborts on the first failure. Regenerating is the recovery path,
//! since the output is fully deterministic.

use thiserror::Error;

/// The main error type for detcert operations.
#[derive(Error, Debug)]
pub enum DetCertError {
    /// The seed length is not a valid AES key length
    #[error("Invalid seed length: {0} bytes (expected 16, 24 or 32)")]
    InvalidSeedLength(usize),

    /// A validity instant could not be parsed
    #[error("Time parse error: {0}")]
    TimeParseError(String),

    /// Key pair generation failed
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Signing, verification or key encoding failed
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Certificate construction or decoding failed
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Invalid input data
    #[error("Parse error: {0}")]
    ParseError(String),

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    PemError(String),

    /// An external tool exited unsuccessfully
    #[error("External tool '{tool}' failed: {status}")]
    ExternalToolError { tool: String, status: String },

    /// File creation or write failure
    #[error("Storage I/O error: {0}")]
    StorageError(#[from] std::io::Error),
}

/// A specialized Result type for detcert operations.
pub type Result<T> = std::result::Result<T, DetCertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DetCertError::CryptoError("test error".to_string());
        assert_eq!(err.to_string(), "Cryptographic error: test error");
    }

    #[test]
    fn test_invalid_seed_length_display() {
        let err = DetCertError::InvalidSeedLength(7);
        assert_eq!(
            err.to_string(),
            "Invalid seed length: 7 bytes (expected 16, 24 or 32)"
        );
    }

    #[test]
    fn test_external_tool_display() {
        let err = DetCertError::ExternalToolError {
            tool: "openssl".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(err.to_string(), "External tool 'openssl' failed: exit status: 1");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DetCertError>();
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DetCertError = io.into();
        assert!(matches!(err, DetCertError::StorageError(_)));
    }
}
