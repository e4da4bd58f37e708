use std::path::Path;

use cdarc_input::DEFAULT_SPOOL_THRESHOLD;
use cdarc_types::Provider;
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};

/// File name of the component descriptor inside an archive.
pub const COMPONENT_DESCRIPTOR_FILE: &str = "component-descriptor.yaml";

/// Directory of the content-addressable blob store inside an archive.
pub const BLOB_DIR: &str = "blobs";

/// Environment variable naming the default archive path.
pub const ARCHIVE_PATH_ENV: &str = "COMPONENT_ARCHIVE_PATH";

/// Layout and behaviour of component archives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ArchiveConfig {
    /// Descriptor file name relative to the archive root.
    pub descriptor_file: String,
    /// Blob directory relative to the archive root.
    pub blob_dir: String,
    /// Bytes of packaged input kept in memory before spilling to disk.
    pub spool_threshold: usize,
    /// Provider recorded by `init`.
    pub default_provider: Provider,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            descriptor_file: COMPONENT_DESCRIPTOR_FILE.to_string(),
            blob_dir: BLOB_DIR.to_string(),
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
            default_provider: Provider::Internal,
        }
    }
}

impl ArchiveConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> ArchiveResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| ArchiveError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&data).map_err(|e| ArchiveError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
