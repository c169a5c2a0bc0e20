//! Package build and open settings.

use serde::{Deserialize, Serialize};

/// Format version written into new manifests.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Creator identity written when none is configured.
pub const DEFAULT_CREATOR: &str = "ptd-rs";

/// How entries are stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Entries are stored verbatim.
    Stored,
    /// Entries are deflate-compressed.
    #[default]
    Deflated,
}

impl Compression {
    pub(crate) fn method(self) -> zip::CompressionMethod {
        match self {
            Self::Stored => zip::CompressionMethod::Stored,
            Self::Deflated => zip::CompressionMethod::Deflated,
        }
    }
}

/// Settings for building a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub version: String,
    pub creator: String,
    pub description: String,
    #[serde(default)]
    pub compression: Compression,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            creator: DEFAULT_CREATOR.to_string(),
            description: String::new(),
            compression: Compression::default(),
        }
    }
}

impl PackageConfig {
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Settings for opening a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Fail with `FileMissing` when a file listed in the manifest is absent
    /// from the archive. When false only files that are present are checked.
    pub require_complete: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            require_complete: true,
        }
    }
}

impl OpenOptions {
    /// Options that only check files physically present in the archive.
    pub fn lenient() -> Self {
        Self {
            require_complete: false,
        }
    }
}
