//! # SHA-256 over Raw Bytes
//!
//! Archived files are hashed over their exact bytes, not a canonical form:
//! the manifest records what was written, and verification recomputes over
//! what was read.

use ptd_core::ContentDigest;
use sha2::{Digest, Sha256};

/// SHA-256 of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest::from_bytes(Sha256::digest(data).into())
}
