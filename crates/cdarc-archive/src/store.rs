use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cdarc_store::{BlobStore, FileSystem, StoreError};
use cdarc_types::{ComponentDescriptor, Digest, OCI_REGISTRY_TYPE};
use tracing::{debug, info};

use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, ArchiveResult};
use crate::validation::{DefaultValidator, Validator};

/// A component descriptor bound to the archive directory it lives in.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentArchive {
    pub root: PathBuf,
    pub descriptor: ComponentDescriptor,
}

impl ComponentArchive {
    pub fn new(root: impl Into<PathBuf>, descriptor: ComponentDescriptor) -> Self {
        Self {
            root: root.into(),
            descriptor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Where a blob ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Path relative to the blob directory, as recorded in `localFilesystemBlob` accesses.
    pub filename: String,
    /// `false` if the blob was already present and nothing was written.
    pub written: bool,
}

/// Options for opening the target archive of an add command.
///
/// If the archive has no descriptor yet and both `component_name` and
/// `component_version` are set, a new archive is initialised. If it exists,
/// the same options overwrite the descriptor's name and version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuilderOptions {
    pub component_name: Option<String>,
    pub component_version: Option<String>,
    /// Base URL of an OCI registry context to append.
    pub repository_context: Option<String>,
}

/// The only component that touches archive storage.
///
/// An archive is a directory holding the component descriptor file and a
/// content-addressable blob directory (see [`ArchiveConfig`] for names).
/// Descriptor writes are atomic: a crash mid-write leaves the previous
/// descriptor in place.
#[derive(Clone)]
pub struct ArchiveStore {
    fs: Arc<dyn FileSystem>,
    config: ArchiveConfig,
    validator: Arc<dyn Validator>,
}

impl ArchiveStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            config: ArchiveConfig::default(),
            validator: Arc::new(DefaultValidator),
        }
    }

    /// Replace the configuration (builder style).
    pub fn with_config(mut self, config: ArchiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the validation rule set (builder style).
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    pub fn descriptor_path(&self, root: &Path) -> PathBuf {
        root.join(&self.config.descriptor_file)
    }

    /// The blob store of the archive at `root`.
    pub fn blob_store(&self, root: &Path) -> BlobStore {
        BlobStore::new(self.fs.clone(), root.join(&self.config.blob_dir))
    }

    /// Create an archive with an empty descriptor at `path`.
    ///
    /// The directory is created if absent. Each registry URL becomes an
    /// `ociRegistry` repository context. An existing descriptor is replaced.
    pub fn init(
        &self,
        path: &Path,
        name: &str,
        version: &str,
        registry_urls: &[String],
    ) -> ArchiveResult<ComponentArchive> {
        match self.fs.stat(path)? {
            Some(meta) if !meta.is_dir() => {
                return Err(ArchiveError::NotADirectory(path.to_path_buf()))
            }
            Some(_) => {}
            None => self.fs.create_dir_all(path)?,
        }

        let mut descriptor = ComponentDescriptor::new(name, version);
        descriptor.component.provider = self.config.default_provider;
        for url in registry_urls {
            descriptor.add_repository_context(OCI_REGISTRY_TYPE, url);
        }

        let archive = ComponentArchive::new(path, descriptor);
        self.persist(&archive)?;
        info!(path = %path.display(), name, version, "component archive initialised");
        Ok(archive)
    }

    /// Read the archive at `path`.
    pub fn load(&self, path: &Path) -> ArchiveResult<ComponentArchive> {
        let descriptor_path = self.descriptor_path(path);
        let data = self.fs.read(&descriptor_path).map_err(|e| match e {
            StoreError::NotFound(_) => ArchiveError::NotFound(path.to_path_buf()),
            other => ArchiveError::Store(other),
        })?;
        let descriptor = decode_descriptor(&data).map_err(|reason| {
            ArchiveError::MalformedDescriptor {
                path: descriptor_path.clone(),
                reason,
            }
        })?;
        debug!(
            path = %path.display(),
            name = %descriptor.name(),
            version = %descriptor.version(),
            "component archive loaded"
        );
        Ok(ComponentArchive::new(path, descriptor))
    }

    /// Whether `path` holds a component descriptor.
    pub fn exists(&self, path: &Path) -> ArchiveResult<bool> {
        Ok(self.fs.exists(&self.descriptor_path(path))?)
    }

    /// Validate the descriptor and atomically overwrite the descriptor file.
    pub fn persist(&self, archive: &ComponentArchive) -> ArchiveResult<()> {
        self.check(&archive.descriptor)?;
        let data = encode_descriptor(&archive.descriptor)?;
        let path = self.descriptor_path(&archive.root);
        self.fs.write_bytes_atomic(&path, data.as_bytes())?;
        debug!(path = %path.display(), bytes = data.len(), "component descriptor written");
        Ok(())
    }

    /// Run the validator and turn violations into an error.
    pub fn check(&self, descriptor: &ComponentDescriptor) -> ArchiveResult<()> {
        let errors = self.validator.validate(descriptor);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::SchemaValidation(errors))
        }
    }

    /// Store blob content under its digest in the archive's blob directory.
    ///
    /// A blob already present under `digest` is left as is and `content` is
    /// not read.
    pub fn put_blob(
        &self,
        archive: &ComponentArchive,
        digest: &Digest,
        content: &mut dyn Read,
    ) -> ArchiveResult<StoredBlob> {
        let written = self.blob_store(&archive.root).put(digest, content)?;
        Ok(StoredBlob {
            filename: BlobStore::relative_name(digest),
            written,
        })
    }

    /// Digests of every blob in the archive.
    pub fn list_blobs(&self, archive: &ComponentArchive) -> ArchiveResult<Vec<Digest>> {
        Ok(self.blob_store(&archive.root).list()?)
    }

    /// The component version, used to default local resource versions.
    pub fn get_version<'a>(&self, archive: &'a ComponentArchive) -> &'a str {
        archive.descriptor.version()
    }

    /// Load the archive at `path`, or initialise it if allowed by `options`.
    ///
    /// Changes requested through `options` on an existing archive are applied
    /// in memory only; they are written with the next [`persist`](Self::persist).
    pub fn open_or_create(
        &self,
        path: &Path,
        options: &BuilderOptions,
    ) -> ArchiveResult<ComponentArchive> {
        if !self.exists(path)? {
            let (Some(name), Some(version)) =
                (&options.component_name, &options.component_version)
            else {
                return Err(ArchiveError::MissingIdentity(path.to_path_buf()));
            };
            let urls: Vec<String> = options.repository_context.iter().cloned().collect();
            return self.init(path, name, version, &urls);
        }

        let mut archive = self.load(path)?;
        let component = &mut archive.descriptor.component;
        if let Some(name) = &options.component_name {
            component.name = name.clone();
        }
        if let Some(version) = &options.component_version {
            component.version = version.clone();
        }
        if let Some(url) = &options.repository_context {
            archive
                .descriptor
                .add_repository_context(OCI_REGISTRY_TYPE, url);
        }
        Ok(archive)
    }
}

impl std::fmt::Debug for ArchiveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStore")
            .field("config", &self.config)
            .field("validator", &self.validator.name())
            .finish()
    }
}

/// Decode a descriptor from YAML (JSON is accepted as a YAML subset).
pub fn decode_descriptor(data: &[u8]) -> Result<ComponentDescriptor, String> {
    serde_yaml::from_slice(data).map_err(|e| e.to_string())
}

/// Encode a descriptor as YAML. Field order follows the struct definitions,
/// so the same descriptor always yields the same bytes.
pub fn encode_descriptor(descriptor: &ComponentDescriptor) -> ArchiveResult<String> {
    serde_yaml::to_string(descriptor).map_err(|e| ArchiveError::Encode(e.to_string()))
}
