//! # Sign / Verify Subcommands
//!
//! Operate on a single envelope document stored as JSON. `sign` validates
//! the envelope structure before signing; `verify` reports the outcome and
//! exits with code 2 when the signature does not hold.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use ptd_core::{Envelope, Signable};

use crate::keys::{is_verification_failure, SignerArgs, VerifyKeyArgs};
use crate::EXIT_VERIFY_FAILED;

/// Arguments for `ptd sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Envelope JSON file to sign.
    pub input: PathBuf,

    /// Where to write the signed envelope. Defaults to stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub signer: SignerArgs,
}

/// Arguments for `ptd verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed envelope JSON file.
    pub input: PathBuf,

    #[command(flatten)]
    pub keys: VerifyKeyArgs,
}

pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let signer = args.signer.require()?;
    let mut envelope = read_envelope(&args.input)?;
    envelope
        .validate()
        .with_context(|| format!("{} is not a valid envelope", args.input.display()))?;

    signer.sign(&mut envelope)?;
    let json = serde_json::to_string_pretty(&envelope)?;
    match &args.out {
        Some(out) => {
            std::fs::write(out, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("OK: signed {} -> {}", envelope.id, out.display());
        }
        None => println!("{json}"),
    }
    Ok(0)
}

pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let keys = args.keys.require()?;
    let envelope = read_envelope(&args.input)?;

    match keys.verify_document(&envelope) {
        Ok(()) => {
            if let Some(sig) = envelope.signature() {
                println!(
                    "OK: {} signed by {} (key {}) at {}",
                    envelope.id, sig.signed_by, sig.public_key_id, sig.signed_at
                );
            }
            Ok(0)
        }
        Err(e) if is_verification_failure(&e) => {
            println!("FAIL: {}: {e}", envelope.id);
            Ok(EXIT_VERIFY_FAILED)
        }
        Err(e) => Err(e.into()),
    }
}

fn read_envelope(path: &Path) -> Result<Envelope> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not an envelope document", path.display()))
}
