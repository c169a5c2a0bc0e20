//! # Signatures and the Signable Capability
//!
//! [`Signature`] is the detached-signature record attached to a document's
//! metadata. [`Signable`] is implemented by every structure that can carry
//! one (envelopes, package manifests) and fixes exactly which bytes are
//! signed.
//!
//! ## Security Invariant
//!
//! The signing input is the JCS canonical form of the structure with its
//! unsigned fields removed from the JSON tree. It is byte-identical whether
//! a signature is attached or not, and whatever that signature contains.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;
use crate::temporal::Timestamp;

/// Algorithm identifier written into every signature produced here.
pub const ALGORITHM_ED25519: &str = "ed25519";

/// A detached signature over a document's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Always `"ed25519"` for signatures produced by this workspace.
    pub algorithm: String,
    /// Identifier of the signing key, resolved by verifiers to a public key.
    pub public_key_id: String,
    /// Base64 (standard alphabet, padded) of the 64 signature bytes.
    pub signature: String,
    pub signed_at: Timestamp,
    /// Identity of the signer, free text.
    pub signed_by: String,
}

/// A structure that carries an optional [`Signature`].
pub trait Signable: Serialize {
    /// The attached signature, if any.
    fn signature(&self) -> Option<&Signature>;

    /// Attach `signature`, replacing any previous one.
    fn set_signature(&mut self, signature: Signature);

    /// Remove every field that is not covered by the signature from the
    /// serialized JSON tree. Always removes the signature itself.
    fn strip_unsigned(value: &mut Value);

    /// Canonical bytes that are signed and verified.
    fn signing_input(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        let mut value = serde_json::to_value(self)?;
        Self::strip_unsigned(&mut value);
        CanonicalBytes::from_value(value)
    }
}
