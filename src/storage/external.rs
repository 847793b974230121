//! External collaborators used while writing fixtures.
//!
//! Private keys for leaf certificates are additionally encrypted by an external
//! helper binary, and certificates are written as `openssl x509 -text` dumps.
//! Both are modelled as traits so tests can substitute in-process fakes.

use crate::cert::x509_signing::cert_from_der;
use crate::cert::x509_signing::cert_to_pem;
use crate::error::{DetCertError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Default nonce file handed to the key encryptor.
pub const DEFAULT_NONCE_FILE: &str = "nonce.txt";

/// Default program used to dump certificates.
pub const DEFAULT_OPENSSL: &str = "openssl";

/// Encrypts a private key file into a keystore file.
pub trait KeyEncryptor {
    fn encrypt(&self, input: &Path, nonce: &Path, output: &Path) -> Result<()>;
}

/// Writes a human-readable dump of a DER certificate to `output`.
pub trait CertificateDumper {
    fn dump(&self, der: &[u8], output: &Path) -> Result<()>;
}

/// Runs the key encryption helper binary.
#[derive(Debug, Clone)]
pub struct CommandKeyEncryptor {
    binary: PathBuf,
    mock_keystore: bool,
}

impl CommandKeyEncryptor {
    /// Create an encryptor that runs `binary` against the mock keystore.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            mock_keystore: true,
        }
    }

    pub fn with_mock_keystore(mut self, mock_keystore: bool) -> Self {
        self.mock_keystore = mock_keystore;
        self
    }

    /// Command-line arguments for one encryption, excluding the program.
    pub fn args(&self, input: &Path, nonce: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--encrypt".into(),
            "--input_file".into(),
            input.into(),
            "--nonce_file".into(),
            nonce.into(),
        ];
        if self.mock_keystore {
            args.push("--ssl_private_key_encryption_helper_uses_mock_keystore".into());
        }
        args.push("--output_file".into());
        args.push(output.into());
        args
    }
}

impl KeyEncryptor for CommandKeyEncryptor {
    fn encrypt(&self, input: &Path, nonce: &Path, output: &Path) -> Result<()> {
        log::debug!(
            "Running {} on {}",
            self.binary.display(),
            input.display()
        );

        let status = Command::new(&self.binary)
            .args(self.args(input, nonce, output))
            .stdin(Stdio::null())
            .status()?;

        check_status(&self.binary, status)
    }
}

/// Pipes DER into `openssl x509 -text -inform DER` and captures its stdout.
///
/// The resulting file holds the text description followed by the PEM block.
#[derive(Debug, Clone)]
pub struct OpensslDumper {
    program: PathBuf,
}

impl OpensslDumper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for OpensslDumper {
    fn default() -> Self {
        Self::new(DEFAULT_OPENSSL)
    }
}

impl CertificateDumper for OpensslDumper {
    fn dump(&self, der: &[u8], output: &Path) -> Result<()> {
        let file = File::create(output)?;

        let mut child = Command::new(&self.program)
            .args(["x509", "-text", "-inform", "DER"])
            .stdin(Stdio::piped())
            .stdout(Stdio::from(file))
            .stderr(Stdio::inherit())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // A tool that exits early closes the pipe; its exit status
            // carries the real failure.
            match stdin.write_all(der) {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }

        let status = child.wait()?;
        check_status(&self.program, status)
    }
}

/// Writes the PEM block only, without calling out to another program.
#[derive(Debug, Clone, Copy, Default)]
pub struct PemDumper;

impl CertificateDumper for PemDumper {
    fn dump(&self, der: &[u8], output: &Path) -> Result<()> {
        let cert = cert_from_der(der)?;
        fs::write(output, cert_to_pem(&cert)?)?;
        Ok(())
    }
}

fn check_status(tool: &Path, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(DetCertError::ExternalToolError {
            tool: tool.display().to_string(),
            status: status.to_string(),
        })
    }
}
