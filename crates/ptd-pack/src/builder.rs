//! # Package Builder
//!
//! Collects entity records and auxiliary files in memory, then writes a zip
//! archive whose `manifest.json` records a [`FileEntry`] for every other
//! file. Entries are computed before the manifest is serialized, so the
//! manifest always describes the exact bytes written next to it.

use std::collections::BTreeMap;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use ptd_core::{EntityType, PtdError, Timestamp};
use ptd_crypto::{sha256_bytes, Signer};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::PackageConfig;
use crate::manifest::{
    content_type_for, entity_file_path, EntityCount, FileEntry, Manifest, MANIFEST_PATH,
};
use crate::signing::sign_manifest;

/// In-memory package under construction.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    config: PackageConfig,
    files: BTreeMap<String, Vec<u8>>,
    entities: BTreeMap<EntityType, u64>,
}

impl PackageBuilder {
    pub fn new(config: PackageConfig) -> Self {
        Self {
            config,
            files: BTreeMap::new(),
            entities: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Write `records` as NDJSON to `<type>/<type>s.ndjson`.
    ///
    /// Calling this again for the same type replaces the earlier records.
    pub fn add_entities<T: Serialize>(
        &mut self,
        entity_type: EntityType,
        records: &[T],
    ) -> Result<&mut Self, PtdError> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| PtdError::Serialization(e.to_string()))?;
            buf.push(b'\n');
        }
        self.files.insert(entity_file_path(entity_type), buf);
        self.entities.insert(entity_type, records.len() as u64);
        Ok(self)
    }

    /// Add an NDJSON file that is already serialized, one record per line.
    pub fn add_ndjson(&mut self, entity_type: EntityType, ndjson: Vec<u8>) -> &mut Self {
        let count = ndjson
            .split(|b| *b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .count() as u64;
        self.files.insert(entity_file_path(entity_type), ndjson);
        self.entities.insert(entity_type, count);
        self
    }

    /// Add an auxiliary file at `path` inside the archive.
    pub fn add_file(&mut self, path: &str, bytes: Vec<u8>) -> Result<&mut Self, PtdError> {
        check_archive_path(path)?;
        self.files.insert(path.to_string(), bytes);
        Ok(self)
    }

    /// Build the manifest for the current contents.
    pub fn manifest(&self) -> Manifest {
        let now = Timestamp::now();
        let mut manifest = Manifest::new(&self.config);
        manifest.created = now;
        for (path, bytes) in &self.files {
            let entry = FileEntry {
                path: path.clone(),
                size: bytes.len() as u64,
                hash: sha256_bytes(bytes),
                modified: now,
                content_type: content_type_for(path).to_string(),
            };
            tracing::debug!(path = %path, size = entry.size, hash = %entry.hash, "hashed file");
            manifest.files.insert(path.clone(), entry);
        }
        for (ty, count) in &self.entities {
            manifest.entities.insert(
                ty.as_str().to_string(),
                EntityCount {
                    entity_type: ty.as_str().to_string(),
                    count: *count,
                },
            );
        }
        manifest
    }

    /// Write the archive to `writer`, signing the manifest when a signer is
    /// given. Returns the manifest that was written.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        signer: Option<&Signer>,
    ) -> Result<Manifest, PtdError> {
        let mut manifest = self.manifest();
        if let Some(signer) = signer {
            sign_manifest(&mut manifest, signer)?;
        }

        let options =
            SimpleFileOptions::default().compression_method(self.config.compression.method());
        let mut zip = ZipWriter::new(writer);

        zip.start_file(MANIFEST_PATH, options).map_err(archive_err)?;
        zip.write_all(&manifest.to_json_pretty()?)?;
        for (path, bytes) in &self.files {
            zip.start_file(path.as_str(), options).map_err(archive_err)?;
            zip.write_all(bytes)?;
        }
        zip.finish().map_err(archive_err)?;

        tracing::info!(
            files = manifest.files.len(),
            entity_types = manifest.entities.len(),
            signed = manifest.signature.is_some(),
            "package written"
        );
        Ok(manifest)
    }

    /// Build the archive in memory.
    pub fn to_bytes(&self, signer: Option<&Signer>) -> Result<(Manifest, Vec<u8>), PtdError> {
        let mut cursor = Cursor::new(Vec::new());
        let manifest = self.write_to(&mut cursor, signer)?;
        Ok((manifest, cursor.into_inner()))
    }

    /// Write the archive to a file at `path`.
    pub fn write_file(
        &self,
        path: impl AsRef<Path>,
        signer: Option<&Signer>,
    ) -> Result<Manifest, PtdError> {
        let (manifest, bytes) = self.to_bytes(signer)?;
        std::fs::write(path, bytes)?;
        Ok(manifest)
    }
}

/// Reject archive paths that could escape the package root or shadow the
/// manifest.
fn check_archive_path(path: &str) -> Result<(), PtdError> {
    let bad = path.is_empty()
        || path == MANIFEST_PATH
        || path.starts_with('/')
        || path.contains('\\')
        || path.ends_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(PtdError::Archive(format!("invalid archive path: {path:?}")));
    }
    Ok(())
}

pub(crate) fn archive_err(e: zip::result::ZipError) -> PtdError {
    PtdError::Archive(e.to_string())
}
