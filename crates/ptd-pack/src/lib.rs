//! # ptd-pack — Portable Tournament Data Packages
//!
//! A package is a zip archive with `manifest.json` at the root and one
//! NDJSON file per entity type at `<type>/<type>s.ndjson`.
//!
//! - **Manifest** (`manifest.rs`): file table with per-file SHA-256 hashes,
//!   entity counts, optional signature.
//! - **Builder** (`builder.rs`): collects records, hashes each file, writes
//!   the archive.
//! - **Opener** (`archive.rs`): rejects unexpected, modified or missing
//!   files before handing out any content.
//! - **Signing** (`signing.rs`): manifest signatures over everything except
//!   the file table.
//!
//! ## Crate Policy
//!
//! - Depends on `ptd-core` and `ptd-crypto` internally.
//! - An open either verifies every file or fails; there is no partial
//!   result.

pub mod archive;
pub mod builder;
pub mod config;
pub mod manifest;
pub mod signing;

pub use archive::{open_package, open_reader, Package, MAX_MANIFEST_SIZE};
pub use builder::PackageBuilder;
pub use config::{Compression, OpenOptions, PackageConfig};
pub use manifest::{
    content_type_for, entity_file_path, EntityCount, FileEntry, Manifest, MANIFEST_PATH,
};
pub use signing::{
    is_signed, sign_manifest, verify_manifest_signature, verify_manifest_with_key_lookup,
};
