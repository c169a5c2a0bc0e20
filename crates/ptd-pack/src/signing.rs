//! Manifest signing.
//!
//! A manifest signature authenticates who produced the package and what it
//! claims to contain by entity count. It does not cover the `files` table;
//! archived bytes are checked against their recorded hashes on open, and a
//! valid manifest signature is no substitute for that check.

use ptd_core::{PtdError, Signable};
use ptd_crypto::{verify, verify_with_key_lookup, Ed25519PublicKey, KeyResolver, Signer};

use crate::manifest::Manifest;

/// Sign `manifest`, replacing any existing signature.
pub fn sign_manifest(manifest: &mut Manifest, signer: &Signer) -> Result<(), PtdError> {
    signer.sign(manifest)?;
    tracing::debug!(key_id = %signer.key_id(), "manifest signed");
    Ok(())
}

/// Verify the manifest signature under `public_key`.
pub fn verify_manifest_signature(
    manifest: &Manifest,
    public_key: &Ed25519PublicKey,
) -> Result<(), PtdError> {
    verify(manifest, public_key)
}

/// Verify the manifest signature, resolving the key from its key id.
pub fn verify_manifest_with_key_lookup<R: KeyResolver + ?Sized>(
    manifest: &Manifest,
    resolver: &R,
) -> Result<(), PtdError> {
    verify_with_key_lookup(manifest, resolver)
}

/// Whether the manifest carries a signature at all.
pub fn is_signed(manifest: &Manifest) -> bool {
    manifest.signature().is_some()
}
