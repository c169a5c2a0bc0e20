//! # Document Signing and Verification
//!
//! [`Signer`] attaches Ed25519 [`Signature`]s to any [`Signable`] structure;
//! [`verify`] and [`verify_with_key_lookup`] check them.
//!
//! Per document the lifecycle is unsigned → signed → verified or failed.
//! Re-signing replaces the previous signature outright.
//!
//! Error mapping:
//!
//! | condition                                  | error                 |
//! |--------------------------------------------|-----------------------|
//! | no signature attached                      | `SignatureMissing`    |
//! | unknown algorithm, undecodable signature   | `SignatureInvalid`    |
//! | decodes, but does not verify under the key | `SignatureFailed`     |
//! | key lookup cannot resolve the key id       | `SignatureKeyMissing` |

use std::collections::BTreeMap;

use ptd_core::error::CryptoError;
use ptd_core::{PtdError, Signable, Signature, Timestamp, ALGORITHM_ED25519};
use serde::{Deserialize, Serialize};

use crate::ed25519::{self, parse_private_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// A signing identity: key pair, key identifier and signer name.
///
/// Immutable after construction.
#[derive(Debug)]
pub struct Signer {
    key_pair: Ed25519KeyPair,
    key_id: String,
    signed_by: String,
}

impl Signer {
    pub fn new(
        key_pair: Ed25519KeyPair,
        key_id: impl Into<String>,
        signed_by: impl Into<String>,
    ) -> Self {
        Self {
            key_pair,
            key_id: key_id.into(),
            signed_by: signed_by.into(),
        }
    }

    /// A signer with a freshly generated key pair.
    pub fn generate(
        key_id: impl Into<String>,
        signed_by: impl Into<String>,
    ) -> Result<Self, PtdError> {
        Ok(Self::new(Ed25519KeyPair::generate()?, key_id, signed_by))
    }

    /// A signer from a base64 64-byte private key.
    pub fn from_private_key_b64(
        private_key: &str,
        key_id: impl Into<String>,
        signed_by: impl Into<String>,
    ) -> Result<Self, PtdError> {
        Ok(Self::new(parse_private_key(private_key)?, key_id, signed_by))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn signed_by(&self) -> &str {
        &self.signed_by
    }

    pub fn key_pair(&self) -> &Ed25519KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.key_pair.public_key()
    }

    pub fn public_key_b64(&self) -> String {
        self.public_key().to_base64()
    }

    /// Sign `doc` now, replacing any existing signature.
    pub fn sign<D: Signable>(&self, doc: &mut D) -> Result<(), PtdError> {
        self.sign_at(doc, Timestamp::now())
    }

    /// Sign `doc` with an explicit signing time.
    pub fn sign_at<D: Signable>(&self, doc: &mut D, signed_at: Timestamp) -> Result<(), PtdError> {
        let input = doc.signing_input()?;
        let sig = self.key_pair.sign(&input);
        tracing::debug!(
            key_id = %self.key_id,
            signed_by = %self.signed_by,
            bytes = input.len(),
            "signed document"
        );
        doc.set_signature(Signature {
            algorithm: ALGORITHM_ED25519.to_string(),
            public_key_id: self.key_id.clone(),
            signature: sig.to_base64(),
            signed_at,
            signed_by: self.signed_by.clone(),
        });
        Ok(())
    }

    /// Verify `doc` against this signer's own public key.
    pub fn verify<D: Signable>(&self, doc: &D) -> Result<(), PtdError> {
        verify(doc, &self.public_key())
    }
}

/// Verify the signature attached to `doc` under `public_key`.
pub fn verify<D: Signable>(doc: &D, public_key: &Ed25519PublicKey) -> Result<(), PtdError> {
    let stored = doc.signature().ok_or(PtdError::SignatureMissing)?;
    if stored.algorithm != ALGORITHM_ED25519 {
        return Err(PtdError::SignatureInvalid(format!(
            "unsupported algorithm {:?}",
            stored.algorithm
        )));
    }
    let sig = Ed25519Signature::from_base64(&stored.signature)
        .map_err(|e| PtdError::SignatureInvalid(e.to_string()))?;
    let input = doc.signing_input()?;
    match ed25519::verify(&input, &sig, public_key) {
        Ok(()) => {
            tracing::debug!(key_id = %stored.public_key_id, "signature verified");
            Ok(())
        }
        Err(CryptoError::VerificationFailed(msg)) => {
            tracing::warn!(key_id = %stored.public_key_id, "signature verification failed");
            Err(PtdError::SignatureFailed(msg))
        }
        Err(other) => Err(other.into()),
    }
}

/// Resolve the signing key from the signature's key id, then [`verify`].
pub fn verify_with_key_lookup<D, R>(doc: &D, resolver: &R) -> Result<(), PtdError>
where
    D: Signable,
    R: KeyResolver + ?Sized,
{
    let stored = doc.signature().ok_or(PtdError::SignatureMissing)?;
    let key = resolver
        .resolve(&stored.public_key_id)
        .ok_or_else(|| PtdError::SignatureKeyMissing(stored.public_key_id.clone()))?;
    verify(doc, &key)
}

/// Maps a signing-key identifier to a public key.
pub trait KeyResolver {
    fn resolve(&self, key_id: &str) -> Option<Ed25519PublicKey>;
}

impl<F> KeyResolver for F
where
    F: Fn(&str) -> Option<Ed25519PublicKey>,
{
    fn resolve(&self, key_id: &str) -> Option<Ed25519PublicKey> {
        self(key_id)
    }
}

/// A set of trusted public keys indexed by key id.
///
/// Serializes as a JSON object of key id to base64 public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRing {
    keys: BTreeMap<String, Ed25519PublicKey>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a key.
    pub fn insert(&mut self, key_id: impl Into<String>, key: Ed25519PublicKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Add or replace a key given in base64.
    pub fn insert_b64(&mut self, key_id: impl Into<String>, key: &str) -> Result<(), PtdError> {
        let key = Ed25519PublicKey::from_base64(key)?;
        self.insert(key_id, key);
        Ok(())
    }

    pub fn get(&self, key_id: &str) -> Option<&Ed25519PublicKey> {
        self.keys.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for KeyRing {
    fn resolve(&self, key_id: &str) -> Option<Ed25519PublicKey> {
        self.keys.get(key_id).copied()
    }
}
