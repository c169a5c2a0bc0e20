//! # ptd-core — Foundational Types for Portable Tournament Data
//!
//! The leaf crate of the workspace. It defines the primitives every signed
//! PTD artifact is built from:
//!
//! 1. **Sortable identifiers.** `ptd:<type>:<raw-id>` with a ULID-layout raw
//!    id, generated monotonically per [`IdGenerator`].
//!
//! 2. **`CanonicalBytes` newtype.** All signing and digest input flows
//!    through JCS canonicalization. No raw `serde_json::to_vec()` for signed
//!    bytes.
//!
//! 3. **Single `EntityType` enum.** One closed set of document kinds,
//!    exhaustive `match` everywhere.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] renders `YYYY-MM-DDTHH:MM:SSZ`
//!    so that re-serialized documents keep their signatures valid.
//!
//! 5. **`Signable` capability.** Envelopes and manifests declare which of
//!    their fields are outside the signature; the signing input is derived
//!    from that in one place.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ptd-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod signature;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::ContentDigest;
pub use entity::EntityType;
pub use envelope::{Envelope, Meta, Provenance, SchemaVersion, Transform};
pub use error::{CanonicalizationError, CryptoError, PtdError};
pub use identity::{
    generate_id, generate_raw, is_valid_id, is_valid_raw, parse_id, IdGenerator, IdParts, PtdId,
    RawId, NAMESPACE,
};
pub use signature::{Signable, Signature, ALGORITHM_ED25519};
pub use temporal::Timestamp;
