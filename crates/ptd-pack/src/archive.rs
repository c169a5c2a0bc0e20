//! # Package Opening and Verification
//!
//! Opening a package reads `manifest.json`, then checks every other entry:
//!
//! 1. it must be listed in the manifest (`UnexpectedFile` otherwise),
//! 2. the SHA-256 of its bytes must equal the recorded hash (`HashMismatch`
//!    otherwise; corruption and tampering are not distinguished),
//! 3. with [`OpenOptions::require_complete`], every listed file must be
//!    present (`FileMissing` otherwise).
//!
//! The first failure aborts the open; no partially verified package is
//! returned. Stored entries are read raw, so the manifest hash is the check
//! that catches a modified byte. A deflated entry whose stream or CRC is
//! damaged counts as a hash mismatch too. Reads are bounded by the size the
//! manifest records, not by the sizes claimed in the zip headers.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ptd_core::{EntityType, PtdError};
use ptd_crypto::{sha256_bytes, Ed25519PublicKey, KeyResolver};
use serde::de::DeserializeOwned;
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

use crate::builder::archive_err;
use crate::config::OpenOptions;
use crate::manifest::{entity_file_path, FileEntry, Manifest, MANIFEST_PATH};
use crate::signing::{verify_manifest_signature, verify_manifest_with_key_lookup};

/// Upper bound on the size of `manifest.json`.
pub const MAX_MANIFEST_SIZE: u64 = 16 * 1024 * 1024;

/// A package whose files have all been checked against its manifest.
#[derive(Debug, Clone)]
pub struct Package {
    manifest: Manifest,
    files: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Verified bytes of the file at `path`.
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Paths of all files present, excluding the manifest.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Decode the NDJSON records stored for `entity_type`.
    pub fn read_entities<T: DeserializeOwned>(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<T>, PtdError> {
        let path = entity_file_path(entity_type);
        let bytes = self
            .files
            .get(&path)
            .ok_or_else(|| PtdError::FileMissing(path.clone()))?;
        bytes
            .split(|b| *b == b'\n')
            .enumerate()
            .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
            .map(|(n, line)| {
                serde_json::from_slice(line).map_err(|e| {
                    PtdError::Serialization(format!("{path} line {}: {e}", n + 1))
                })
            })
            .collect()
    }

    /// Verify the manifest signature under `public_key`.
    pub fn verify_signature(&self, public_key: &Ed25519PublicKey) -> Result<(), PtdError> {
        verify_manifest_signature(&self.manifest, public_key)
    }

    /// Verify the manifest signature, resolving the key from its key id.
    pub fn verify_signature_with_key_lookup<R: KeyResolver + ?Sized>(
        &self,
        resolver: &R,
    ) -> Result<(), PtdError> {
        verify_manifest_with_key_lookup(&self.manifest, resolver)
    }
}

/// Open and verify the package at `path`.
pub fn open_package(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Package, PtdError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    tracing::debug!(path = %path.display(), "opening package");
    open_reader(BufReader::new(file), options)
}

/// Open and verify a package from any seekable reader.
pub fn open_reader<R: Read + Seek>(reader: R, options: &OpenOptions) -> Result<Package, PtdError> {
    let mut zip = ZipArchive::new(reader).map_err(archive_err)?;
    let manifest = read_manifest(&mut zip)?;

    let mut files = BTreeMap::new();
    for index in 0..zip.len() {
        let (name, stored) = {
            let raw = zip.by_index_raw(index).map_err(archive_err)?;
            if raw.is_dir() {
                continue;
            }
            (
                raw.name().to_string(),
                raw.compression() == CompressionMethod::Stored,
            )
        };
        if name == MANIFEST_PATH {
            continue;
        }
        let Some(entry) = manifest.files.get(&name) else {
            tracing::warn!(path = %name, "file not listed in manifest");
            return Err(PtdError::UnexpectedFile(name));
        };
        let bytes = read_listed_entry(&mut zip, index, stored, &name, entry)?;
        files.insert(name, bytes);
    }

    let present: BTreeSet<&String> = files.keys().collect();
    let missing: Vec<&String> = manifest
        .files
        .keys()
        .filter(|p| !present.contains(p))
        .collect();
    if let Some(first) = missing.first() {
        if options.require_complete {
            tracing::warn!(path = %first, "listed file absent from archive");
            return Err(PtdError::FileMissing((*first).clone()));
        }
        tracing::debug!(missing = missing.len(), "listed files absent, completeness not required");
    }

    tracing::info!(
        files = files.len(),
        signed = manifest.signature.is_some(),
        "package verified"
    );
    Ok(Package { manifest, files })
}

fn read_manifest<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Manifest, PtdError> {
    let entry = match zip.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(PtdError::ManifestMissing),
        Err(e) => return Err(archive_err(e)),
    };
    let mut bytes = Vec::new();
    entry
        .take(MAX_MANIFEST_SIZE + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| PtdError::ManifestInvalid(format!("unreadable: {e}")))?;
    if bytes.len() as u64 > MAX_MANIFEST_SIZE {
        return Err(PtdError::ManifestInvalid(format!(
            "larger than {MAX_MANIFEST_SIZE} bytes"
        )));
    }
    Manifest::from_slice(&bytes)
}

/// Read a listed entry and check it against its manifest record.
///
/// At most `entry.size + 1` bytes are read, so the sizes declared in the zip
/// headers never drive an allocation. Content that cannot be read back
/// (a failed CRC or a broken deflate stream) is reported as a hash mismatch
/// over whatever was read before the failure.
fn read_listed_entry<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    index: usize,
    stored: bool,
    name: &str,
    entry: &FileEntry,
) -> Result<Vec<u8>, PtdError> {
    let file = if stored {
        zip.by_index_raw(index)
    } else {
        zip.by_index(index)
    }
    .map_err(archive_err)?;

    let mut bytes = Vec::new();
    let read = file
        .take(entry.size.saturating_add(1))
        .read_to_end(&mut bytes);
    let actual = sha256_bytes(&bytes);
    match read {
        Ok(_) if actual == entry.hash => return Ok(bytes),
        Ok(_) => {
            tracing::warn!(path = %name, expected = %entry.hash, actual = %actual, "hash mismatch");
        }
        Err(e) => {
            tracing::warn!(path = %name, error = %e, "entry content unreadable");
        }
    }
    Err(PtdError::HashMismatch {
        path: name.to_string(),
        expected: entry.hash.to_hex(),
        actual: actual.to_hex(),
    })
}
