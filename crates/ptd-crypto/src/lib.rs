//! # ptd-crypto — Signing and Hashing
//!
//! - **Ed25519** key material with base64 external forms, and signing over
//!   `CanonicalBytes` only.
//! - **Document signing**: [`Signer`] attaches signatures to any
//!   [`Signable`](ptd_core::Signable); [`verify`] and
//!   [`verify_with_key_lookup`] check them.
//! - **SHA-256** over raw archived bytes.
//!
//! ## Crate Policy
//!
//! - Depends only on `ptd-core` internally.
//! - No mocking of cryptographic operations in tests. All tests use real
//!   `CanonicalBytes`, real SHA-256, real Ed25519.
//! - Private key bytes never reach a log line or `Debug` output.

pub mod ed25519;
pub mod sha256;
pub mod signer;

pub use ed25519::{
    generate_key_pair, parse_private_key, parse_public_key, Ed25519KeyPair, Ed25519PublicKey,
    Ed25519Signature, ExportedKeyPair,
};
pub use sha256::sha256_bytes;
pub use signer::{verify, verify_with_key_lookup, KeyResolver, KeyRing, Signer};
