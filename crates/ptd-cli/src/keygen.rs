//! # Keygen Subcommand
//!
//! Generates an Ed25519 key pair and writes it as
//! `{"public_key": "...", "private_key": "..."}` with both halves in
//! standard base64. The private key is the 64-byte seed ‖ public form.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use ptd_crypto::generate_key_pair;

/// Arguments for `ptd keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output path for the key pair file.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    if args.out.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            args.out.display()
        );
    }
    let pair = generate_key_pair().context("failed to generate key pair")?;
    let exported = pair.to_exported();
    let json = serde_json::to_string_pretty(&exported)?;
    write_private(&args.out, json.as_bytes())
        .with_context(|| format!("failed to write key file: {}", args.out.display()))?;

    tracing::info!(path = %args.out.display(), "wrote key pair");
    println!("public key: {}", exported.public_key);
    Ok(0)
}

#[cfg(unix)]
fn write_private(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}
