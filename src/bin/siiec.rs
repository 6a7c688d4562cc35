//! siiec: operator tooling for report envelopes.
//!
//! Usage:
//!   siiec keygen --output <dir> [--print-env]
//!   siiec seal --key <public.pem> [--input <report.json>] [--output <envelope.json>]
//!   siiec open --key <private.pem> [--input <envelope.json>]
//!   siiec inspect <envelope.json>

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand_core::OsRng;

use siiec_envelope::{
    escape_pem, generate_keypair, Envelope, HybridDecryptor, HybridEncryptor, DEFAULT_MAX_ENVELOPE_BYTES,
    ENV_PRIVATE_KEY,
};

#[derive(Parser)]
#[command(name = "siiec")]
#[command(author, version, about = "Hybrid RSA-OAEP-4096 + AES-256-GCM envelopes for incident reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an RSA-4096 key pair (PEM SPKI + PKCS8)
    Keygen {
        /// Directory for public.pem and private.pem
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Also print the private key as a single-line environment variable
        #[arg(long)]
        print_env: bool,
    },

    /// Encrypt a JSON report body into an envelope
    Seal {
        /// Recipient public key (PEM SPKI)
        #[arg(short, long)]
        key: PathBuf,

        /// Report body JSON (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Envelope output (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt an envelope and print the sanitized report body
    Open {
        /// Recipient private key (PEM PKCS8)
        #[arg(short, long)]
        key: PathBuf,

        /// Envelope JSON (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show envelope metadata without decrypting
    Inspect {
        /// Envelope JSON
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Keygen { output, print_env } => cmd_keygen(&output, print_env),
        Commands::Seal { key, input, output } => cmd_seal(&key, input.as_deref(), output.as_deref()),
        Commands::Open { key, input } => cmd_open(&key, input.as_deref()),
        Commands::Inspect { file } => cmd_inspect(&file),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Creates the key file owner-only from the start. Refuses to overwrite.
fn write_private_key(path: &Path, pem: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(pem)?;
    file.sync_all()?;
    Ok(())
}

fn cmd_keygen(output: &Path, print_env: bool) -> Result<()> {
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;

    eprintln!("Generating RSA-4096 key pair (this can take a few seconds)...");
    let (pk, sk) = generate_keypair(&mut OsRng)?;

    let pk_path = output.join("public.pem");
    let sk_path = output.join("private.pem");
    let sk_pem = sk.to_pkcs8_pem()?;

    write_private_key(&sk_path, sk_pem.as_bytes())?;
    fs::write(&pk_path, pk.to_public_key_pem()?)?;

    eprintln!("Generated key pair:");
    eprintln!("  Public key:   {}", pk_path.display());
    eprintln!("  Private key:  {} (mode 600)", sk_path.display());
    eprintln!("  Fingerprint:  {}", pk.fingerprint()?);

    if print_env {
        println!("{}=\"{}\"", ENV_PRIVATE_KEY, escape_pem(&sk_pem));
    }
    Ok(())
}

fn cmd_seal(key: &Path, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let pem = fs::read_to_string(key).with_context(|| format!("reading {}", key.display()))?;
    let encryptor = HybridEncryptor::from_public_key_pem(&pem)?;

    let plaintext = read_input(input)?;
    let envelope = encryptor.encrypt(&plaintext)?;
    let json = envelope.to_json_pretty();

    match output {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!("Sealed {} bytes -> {}", plaintext.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_open(key: &Path, input: Option<&Path>) -> Result<()> {
    let pem = fs::read_to_string(key).with_context(|| format!("reading {}", key.display()))?;
    let decryptor = HybridDecryptor::from_pkcs8_pem(&pem)?;

    let envelope = Envelope::from_json(&read_input(input)?, DEFAULT_MAX_ENVELOPE_BYTES)?;
    let body = decryptor.decrypt(&envelope)?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let envelope = Envelope::from_json(&text, DEFAULT_MAX_ENVELOPE_BYTES)?;
    let info = envelope.inspect()?;

    println!("{}", info);
    if !info.key_matches_modulus {
        bail!("wrapped key is not 512 bytes; the client likely used a stale or wrong-sized public key");
    }
    Ok(())
}
