//! # Package Manifest
//!
//! `manifest.json` sits at the archive root and lists every other file with
//! its size, SHA-256 hash, modification time and content type, plus a count
//! of entities per type.
//!
//! ## Signed Payload
//!
//! The manifest signature covers `version`, `created`, `creator`,
//! `description` and `entities`. The `files` table is removed from the
//! signing input together with the signature itself: the bytes of archived
//! files are authenticated by the per-file hashes checked on open, not by
//! the manifest signature.

use std::collections::BTreeMap;

use ptd_core::{ContentDigest, EntityType, PtdError, Signable, Signature, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PackageConfig;

/// Archive path of the manifest.
pub const MANIFEST_PATH: &str = "manifest.json";

/// Package index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub created: Timestamp,
    pub creator: String,
    pub description: String,
    /// Archive path → entry. Keys are unique by construction.
    pub files: BTreeMap<String, FileEntry>,
    /// Entity type name → count.
    pub entities: BTreeMap<String, EntityCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

/// One archived file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    /// SHA-256 of the raw file bytes, lowercase hex.
    pub hash: ContentDigest,
    pub modified: Timestamp,
    /// MIME type derived from the extension.
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub count: u64,
}

impl Manifest {
    /// An empty manifest created now.
    pub fn new(config: &PackageConfig) -> Self {
        Self {
            version: config.version.clone(),
            created: Timestamp::now(),
            creator: config.creator.clone(),
            description: config.description.clone(),
            files: BTreeMap::new(),
            entities: BTreeMap::new(),
            signature: None,
        }
    }

    /// Parse `manifest.json` bytes and check table consistency.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PtdError> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| PtdError::ManifestInvalid(e.to_string()))?;
        manifest.check_consistency()?;
        Ok(manifest)
    }

    /// Pretty-printed JSON as written into the archive.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, PtdError> {
        serde_json::to_vec_pretty(self).map_err(|e| PtdError::Serialization(e.to_string()))
    }

    /// Entity count for `entity_type`, zero if the type is absent.
    pub fn entity_count(&self, entity_type: EntityType) -> u64 {
        self.entities
            .get(entity_type.as_str())
            .map_or(0, |c| c.count)
    }

    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }

    fn check_consistency(&self) -> Result<(), PtdError> {
        for (key, entry) in &self.files {
            if key != &entry.path {
                return Err(PtdError::ManifestInvalid(format!(
                    "file table key {key:?} does not match entry path {:?}",
                    entry.path
                )));
            }
            if key == MANIFEST_PATH {
                return Err(PtdError::ManifestInvalid(
                    "manifest lists itself as a file".to_string(),
                ));
            }
        }
        for (key, count) in &self.entities {
            if key != &count.entity_type {
                return Err(PtdError::ManifestInvalid(format!(
                    "entity table key {key:?} does not match type {:?}",
                    count.entity_type
                )));
            }
        }
        Ok(())
    }
}

impl Signable for Manifest {
    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = Some(signature);
    }

    fn strip_unsigned(value: &mut Value) {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("signature");
            obj.remove("files");
        }
    }
}

/// Archive path of the NDJSON file holding `entity_type` records.
pub fn entity_file_path(entity_type: EntityType) -> String {
    format!("{0}/{0}s.ndjson", entity_type.as_str())
}

/// Content type for an archive path, by case-insensitive extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty() && !stem.ends_with('/'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("ndjson") => "application/x-ndjson",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}
