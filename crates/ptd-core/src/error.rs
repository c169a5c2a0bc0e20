//! # Error Types
//!
//! Defines the error types used throughout the PTD workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every integrity or cryptographic failure is terminal. Nothing here is
//!   retryable: a failure means a programmer error, tampering, or corruption.
//! - Hash mismatches carry the archive path together with the expected and
//!   actual digests.
//! - Key material never appears in an error message.

use thiserror::Error;

/// Top-level error type for PTD operations.
#[derive(Error, Debug)]
pub enum PtdError {
    /// Identifier is missing or not of the form `ptd:<type>:<raw-id>`.
    #[error("invalid or missing ID: {0}")]
    InvalidId(String),

    /// Entity type is missing, unknown, or inconsistent with the identifier.
    #[error("invalid or missing entity type: {0}")]
    InvalidType(String),

    /// Document metadata carries no schema version.
    #[error("missing schema version")]
    MissingSchema,

    /// Schema version string is malformed.
    #[error("invalid schema version: {0}")]
    InvalidSchema(String),

    /// Verification was requested on a document with no signature.
    #[error("signature required but missing")]
    SignatureMissing,

    /// The stored signature could not be decoded.
    #[error("invalid signature: {0}")]
    SignatureInvalid(String),

    /// The signature decoded but did not verify against the canonical bytes.
    #[error("signature verification failed: {0}")]
    SignatureFailed(String),

    /// No public key is known for the signing-key identifier.
    #[error("signing key not found: {0}")]
    SignatureKeyMissing(String),

    /// The archive has no `manifest.json` at its root.
    #[error("manifest.json not found")]
    ManifestMissing,

    /// The manifest exists but cannot be parsed or is inconsistent.
    #[error("invalid manifest: {0}")]
    ManifestInvalid(String),

    /// A file's content hash differs from the hash recorded in the manifest.
    #[error("file hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Archive path of the offending file.
        path: String,
        /// Hash recorded in the manifest.
        expected: String,
        /// Hash computed over the archived bytes.
        actual: String,
    },

    /// The archive contains a file that the manifest does not list.
    #[error("unexpected file in package: {0}")]
    UnexpectedFile(String),

    /// The manifest lists a file that the archive does not contain.
    #[error("file listed in manifest is missing from package: {0}")]
    FileMissing(String),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Key handling failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The archive container could not be read or written.
    #[error("archive error: {0}")]
    Archive(String),

    /// Serialization/deserialization error outside the canonical path.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
///
/// Canonicalization only fails when a structure holds a value JSON cannot
/// represent (for example a map keyed by a non-string type). That is a
/// programmer error, not a user or runtime error.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in key handling.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key decoding or length check failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// The signature did not verify under the given key.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The operating system entropy source failed.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}
