//! detcert CLI application.
//!
//! This binary regenerates the deterministic certificate fixtures, dumps raw
//! generator output, and verifies a previously written fixture directory.

use clap::{Parser, Subcommand, ValueEnum};
use detcert::cert::chain::{verify_chain_certificates, FixtureChain, FixtureRole};
use detcert::crypto::aes_random::{AesRandom, DEFAULT_SEED_PHRASE};
use detcert::error::Result;
use detcert::storage::external::{
    CertificateDumper, CommandKeyEncryptor, OpensslDumper, PemDumper, DEFAULT_NONCE_FILE,
    DEFAULT_OPENSSL,
};
use detcert::storage::writer::{
    load_chain_bundle, load_fixture_certificates, write_chain_bundle, FixtureWriter,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "detcert")]
#[command(about = "Deterministic test certificate generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumperKind {
    /// `openssl x509 -text` dump followed by PEM
    Openssl,
    /// PEM only
    Pem,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the certificate chain and write it to disk
    Generate {
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Seed phrase for the deterministic generator
        #[arg(long, default_value = DEFAULT_SEED_PHRASE)]
        seed: String,

        /// How certificates are written
        #[arg(long, value_enum, default_value = "openssl")]
        dumper: DumperKind,

        /// OpenSSL program used by the openssl dumper
        #[arg(long, default_value = DEFAULT_OPENSSL)]
        openssl: PathBuf,

        /// Key encryption helper binary (leaf keys are not encrypted without it)
        #[arg(long)]
        key_encryptor: Option<PathBuf>,

        /// Nonce file passed to the key encryptor
        #[arg(long, default_value = DEFAULT_NONCE_FILE)]
        nonce_file: PathBuf,

        /// Do not pass the mock keystore flag to the key encryptor
        #[arg(long)]
        no_mock_keystore: bool,

        /// Also write all four certificates to this PEM bundle
        #[arg(long)]
        bundle: Option<PathBuf>,
    },

    /// Print generator output as hex
    Random {
        /// Number of bytes
        #[arg(long, default_value = "32")]
        length: usize,

        /// Seed phrase for the deterministic generator
        #[arg(long, default_value = DEFAULT_SEED_PHRASE)]
        seed: String,
    },

    /// Verify the certificates in a fixture directory or PEM bundle
    Verify {
        /// Fixture directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// PEM bundle to verify instead of the directory
        #[arg(long)]
        bundle: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            out_dir,
            seed,
            dumper,
            openssl,
            key_encryptor,
            nonce_file,
            no_mock_keystore,
            bundle,
        } => {
            let dumper: Box<dyn CertificateDumper> = match dumper {
                DumperKind::Openssl => Box::new(OpensslDumper::new(openssl)),
                DumperKind::Pem => Box::new(PemDumper),
            };

            let mut writer = FixtureWriter::new(out_dir, dumper).with_nonce_file(nonce_file);
            if let Some(binary) = key_encryptor {
                writer = writer.with_encryptor(Box::new(
                    CommandKeyEncryptor::new(binary).with_mock_keystore(!no_mock_keystore),
                ));
            }

            let mut rng = AesRandom::from_phrase(&seed);
            let chain = FixtureChain::generate(&mut rng)?;
            let written = writer.write(&chain)?;
            if let Some(bundle) = bundle {
                write_chain_bundle(&chain, &bundle)?;
            }

            println!(
                "✓ Wrote {} files to {}",
                written.len(),
                writer.out_dir().display()
            );
            Ok(())
        }

        Commands::Random { length, seed } => {
            let mut rng = AesRandom::from_phrase(&seed);
            let mut buf = vec![0u8; length];
            rng.fill(&mut buf);
            println!("{}", hex::encode(&buf));
            Ok(())
        }

        Commands::Verify { dir, bundle } => {
            let certs = match bundle {
                Some(bundle) => load_chain_bundle(&bundle)?,
                None => load_fixture_certificates(&dir)?,
            };
            let [root, intermediate, rsa_leaf, ecdsa_leaf] = &certs;
            verify_chain_certificates([root, intermediate, rsa_leaf, ecdsa_leaf])?;

            for (role, cert) in FixtureRole::ALL.iter().zip(certs.iter()) {
                println!(
                    "✓ {:<22} serial {}  subject {}",
                    role.file_stem(),
                    role.serial(),
                    cert.tbs_certificate.subject
                );
            }
            Ok(())
        }
    }
}
