//! # Ed25519 Key Material and Raw Signatures
//!
//! Key pairs, public keys and signatures, together with their base64
//! external forms:
//!
//! - public key: 32 raw bytes,
//! - private key: 64 raw bytes (32-byte seed followed by the public key),
//! - signature: 64 raw bytes,
//!
//! each encoded with the standard padded base64 alphabet.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`. Raw byte slices cannot be
//!   signed.
//! - `Ed25519KeyPair` does not implement `Serialize`; private key bytes leave
//!   the type only through [`Ed25519KeyPair::to_exported`], and its `Debug`
//!   output is redacted.
//! - Parsing rejects any input that does not decode to exactly the expected
//!   number of bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::Signer;
use ptd_core::error::CryptoError;
use ptd_core::CanonicalBytes;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw length of a public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Raw length of a private key (seed ‖ public key).
pub const PRIVATE_KEY_LEN: usize = 64;
/// Raw length of a signature.
pub const SIGNATURE_LEN: usize = 64;

/// An Ed25519 public key (32 bytes).
///
/// Serializes as a base64 string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; PUBLIC_KEY_LEN]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; SIGNATURE_LEN]);

/// An Ed25519 key pair for signing operations.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

/// A key pair in its base64 external form, as written by `ptd keygen`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl std::fmt::Debug for ExportedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse a base64 public key. Must decode to exactly 32 bytes.
    pub fn from_base64(b64: &str) -> Result<Self, CryptoError> {
        let bytes = decode_exact::<PUBLIC_KEY_LEN>(b64, "public key")?;
        Ok(Self(bytes))
    }

    /// Convert to an `ed25519_dalek::VerifyingKey`.
    ///
    /// Fails if the bytes are not a valid curve point.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let b64 = String::deserialize(deserializer)?;
        Self::from_base64(&b64).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// Parse a base64 public key (exactly 32 bytes).
pub fn parse_public_key(b64: &str) -> Result<Ed25519PublicKey, CryptoError> {
    Ed25519PublicKey::from_base64(b64)
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse a base64 signature. Must decode to exactly 64 bytes.
    pub fn from_base64(b64: &str) -> Result<Self, CryptoError> {
        let bytes = decode_exact::<SIGNATURE_LEN>(b64, "signature")?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_prefix(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a fresh key pair from the operating system entropy source.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
        seed.fill(0);
        Ok(Self { signing_key })
    }

    /// Create a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Create a key pair from the 64-byte private key form.
    ///
    /// Fails if the trailing public half does not belong to the seed.
    pub fn from_private_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<Self, CryptoError> {
        let signing_key = ed25519_dalek::SigningKey::from_keypair_bytes(bytes).map_err(|_| {
            CryptoError::KeyError("public half of private key does not match seed".to_string())
        })?;
        Ok(Self { signing_key })
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Export both halves as base64. This is the only way private key bytes
    /// leave the key pair.
    pub fn to_exported(&self) -> ExportedKeyPair {
        ExportedKeyPair {
            public_key: self.public_key().to_base64(),
            private_key: STANDARD.encode(self.signing_key.to_keypair_bytes()),
        }
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

/// Parse a base64 private key (exactly 64 bytes, seed ‖ public key).
pub fn parse_private_key(b64: &str) -> Result<Ed25519KeyPair, CryptoError> {
    let bytes = decode_exact::<PRIVATE_KEY_LEN>(b64, "private key")?;
    Ed25519KeyPair::from_private_bytes(&bytes)
}

/// Generate a fresh key pair.
pub fn generate_key_pair() -> Result<Ed25519KeyPair, CryptoError> {
    Ed25519KeyPair::generate()
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a signature over canonical bytes.
///
/// Uses strict verification, which rejects small-order keys and
/// non-canonical signature encodings.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn decode_exact<const N: usize>(b64: &str, what: &str) -> Result<[u8; N], CryptoError> {
    let bytes = STANDARD
        .decode(b64.trim())
        .map_err(|e| CryptoError::KeyError(format!("{what} is not valid base64: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::KeyError(format!(
            "{what} must decode to {N} bytes, got {}",
            bytes.len()
        ))
    })
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(v: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&v).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Ed25519KeyPair::generate().unwrap();
        let data = canonical(serde_json::json!({"message": "hello", "nonce": 42}));
        let sig = kp.sign(&data);
        verify(&data, &sig, &kp.public_key()).expect("valid signature should verify");
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let kp1 = Ed25519KeyPair::generate().unwrap();
        let kp2 = Ed25519KeyPair::generate().unwrap();
        let data = canonical(serde_json::json!({"test": true}));
        let sig = kp1.sign(&data);
        assert!(verify(&data, &sig, &kp2.public_key()).is_err());
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        let kp = Ed25519KeyPair::generate().unwrap();
        let sig = kp.sign(&canonical(serde_json::json!({"msg": "original"})));
        let tampered = canonical(serde_json::json!({"msg": "tampered"}));
        assert!(verify(&tampered, &sig, &kp.public_key()).is_err());
    }

    #[test]
    fn test_deterministic_from_seed() {
        let kp1 = Ed25519KeyPair::from_seed(&[42u8; 32]);
        let kp2 = Ed25519KeyPair::from_seed(&[42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        let data = canonical(serde_json::json!({"test": "deterministic"}));
        assert_eq!(kp1.sign(&data), kp2.sign(&data));
    }

    #[test]
    fn test_exported_lengths() {
        let exported = Ed25519KeyPair::generate().unwrap().to_exported();
        assert_eq!(STANDARD.decode(&exported.public_key).unwrap().len(), 32);
        assert_eq!(STANDARD.decode(&exported.private_key).unwrap().len(), 64);
    }

    #[test]
    fn test_private_key_roundtrip_preserves_signatures() {
        let kp = Ed25519KeyPair::generate().unwrap();
        let exported = kp.to_exported();
        let restored = parse_private_key(&exported.private_key).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
        let data = canonical(serde_json::json!({"x": 1}));
        assert_eq!(restored.sign(&data), kp.sign(&data));
        assert_eq!(parse_public_key(&exported.public_key).unwrap(), kp.public_key());
    }

    #[test]
    fn test_parse_rejects_wrong_lengths() {
        assert!(parse_public_key(&STANDARD.encode([1u8; 31])).is_err());
        assert!(parse_public_key(&STANDARD.encode([1u8; 33])).is_err());
        assert!(parse_public_key(&STANDARD.encode([1u8; 64])).is_err());
        assert!(parse_private_key(&STANDARD.encode([1u8; 32])).is_err());
        assert!(parse_private_key(&STANDARD.encode([1u8; 65])).is_err());
        assert!(parse_public_key("not base64 !!").is_err());
        assert!(Ed25519Signature::from_base64(&STANDARD.encode([0u8; 63])).is_err());
    }

    #[test]
    fn test_private_key_with_foreign_public_half_rejected() {
        let a = Ed25519KeyPair::from_seed(&[1u8; 32]).to_exported();
        let b = Ed25519KeyPair::from_seed(&[2u8; 32]).to_exported();
        let mut mixed = STANDARD.decode(&a.private_key).unwrap();
        let b_pub = STANDARD.decode(&b.public_key).unwrap();
        mixed[32..].copy_from_slice(&b_pub);
        assert!(parse_private_key(&STANDARD.encode(&mixed)).is_err());
    }

    #[test]
    fn test_public_key_serde_is_base64_string() {
        let pk = Ed25519KeyPair::generate().unwrap().public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", pk.to_base64()));
        let back: Ed25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn test_debug_does_not_leak_private_key() {
        let kp = Ed25519KeyPair::generate().unwrap();
        assert_eq!(format!("{kp:?}"), "Ed25519KeyPair(<private>)");
        let exported = kp.to_exported();
        let debug = format!("{exported:?}");
        assert!(!debug.contains(&exported.private_key));
        assert!(debug.contains("<redacted>"));
    }
}
