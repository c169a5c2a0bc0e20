//! # Key Options
//!
//! Shared argument groups for commands that sign (`--key-file`) and commands
//! that verify (`--public-key`, `--verify-key-file` or `--keyring`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use ptd_core::{PtdError, Signable};
use ptd_crypto::{
    parse_public_key, verify, verify_with_key_lookup, Ed25519PublicKey, ExportedKeyPair, KeyRing,
    Signer,
};
use ptd_pack::Package;

/// Options selecting the signing key.
#[derive(Args, Debug, Clone)]
pub struct SignerArgs {
    /// Key pair file written by `ptd keygen`.
    #[arg(long, env = "PTD_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Key identifier recorded in the signature.
    #[arg(long, env = "PTD_KEY_ID", default_value = "default")]
    pub key_id: String,

    /// Signer name recorded in the signature.
    #[arg(long, env = "PTD_SIGNED_BY", default_value = "ptd-cli")]
    pub signed_by: String,
}

impl SignerArgs {
    /// The configured signer, or `None` when no key file was given.
    pub fn load(&self) -> Result<Option<Signer>> {
        let Some(path) = &self.key_file else {
            return Ok(None);
        };
        let pair = read_key_file(path)?;
        let signer = Signer::from_private_key_b64(&pair.private_key, &self.key_id, &self.signed_by)
            .with_context(|| format!("invalid private key in {}", path.display()))?;
        if signer.public_key_b64() != pair.public_key {
            bail!(
                "public key in {} does not match its private key",
                path.display()
            );
        }
        tracing::debug!(key_id = %self.key_id, signed_by = %self.signed_by, "loaded signing key");
        Ok(Some(signer))
    }

    /// Like [`load`](Self::load), but a key file is mandatory.
    pub fn require(&self) -> Result<Signer> {
        self.load()?
            .context("a signing key is required: pass --key-file or set PTD_KEY_FILE")
    }
}

/// Options selecting the trusted verification key(s). At most one may be given.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct VerifyKeyArgs {
    /// Base64 Ed25519 public key.
    #[arg(long)]
    pub public_key: Option<String>,

    /// Key pair file; only its public half is used.
    #[arg(long = "verify-key-file")]
    pub key_file: Option<PathBuf>,

    /// JSON object mapping key ids to base64 public keys.
    #[arg(long)]
    pub keyring: Option<PathBuf>,
}

/// Keys a signature may be checked against.
#[derive(Debug, Clone)]
pub enum TrustedKeys {
    /// A single key, used whatever key id the signature names.
    Key(Ed25519PublicKey),
    /// Keys looked up by the signature's key id.
    Ring(KeyRing),
}

impl VerifyKeyArgs {
    /// The configured keys, or `None` when no option was given.
    pub fn load(&self) -> Result<Option<TrustedKeys>> {
        if let Some(b64) = &self.public_key {
            let key = parse_public_key(b64).context("invalid --public-key")?;
            return Ok(Some(TrustedKeys::Key(key)));
        }
        if let Some(path) = &self.key_file {
            let pair = read_key_file(path)?;
            let key = parse_public_key(&pair.public_key)
                .with_context(|| format!("invalid public key in {}", path.display()))?;
            return Ok(Some(TrustedKeys::Key(key)));
        }
        if let Some(path) = &self.keyring {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read keyring: {}", path.display()))?;
            let ring: KeyRing = serde_json::from_slice(&bytes)
                .with_context(|| format!("invalid keyring: {}", path.display()))?;
            tracing::debug!(keys = ring.len(), "loaded keyring");
            return Ok(Some(TrustedKeys::Ring(ring)));
        }
        Ok(None)
    }

    pub fn require(&self) -> Result<TrustedKeys> {
        self.load()?.context(
            "a verification key is required: pass --public-key, --verify-key-file or --keyring",
        )
    }
}

impl TrustedKeys {
    pub fn verify_document<D: Signable>(&self, doc: &D) -> Result<(), PtdError> {
        match self {
            Self::Key(key) => verify(doc, key),
            Self::Ring(ring) => verify_with_key_lookup(doc, ring),
        }
    }

    pub fn verify_package(&self, package: &Package) -> Result<(), PtdError> {
        match self {
            Self::Key(key) => package.verify_signature(key),
            Self::Ring(ring) => package.verify_signature_with_key_lookup(ring),
        }
    }
}

/// Errors that mean "the input is not authentic", as opposed to operational
/// failures. Reported with [`EXIT_VERIFY_FAILED`](crate::EXIT_VERIFY_FAILED).
pub fn is_verification_failure(err: &PtdError) -> bool {
    matches!(
        err,
        PtdError::SignatureMissing
            | PtdError::SignatureInvalid(_)
            | PtdError::SignatureFailed(_)
            | PtdError::SignatureKeyMissing(_)
            | PtdError::ManifestMissing
            | PtdError::ManifestInvalid(_)
            | PtdError::HashMismatch { .. }
            | PtdError::UnexpectedFile(_)
            | PtdError::FileMissing(_)
    )
}

pub fn read_key_file(path: &Path) -> Result<ExportedKeyPair> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read key file: {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("invalid key file: {}", path.display()))
}
