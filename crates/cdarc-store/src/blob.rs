use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cdarc_types::Digest;
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::FileSystem;

/// Content-addressable blob directory.
///
/// A blob with digest `sha256:abcd...` lives at `<root>/sha256/ab/abcd...`:
/// the algorithm, a shard directory named after the first hash byte, then the
/// full hex digest as the file name.
///
/// Blobs are immutable once written. Writing a digest that is already present
/// is a no-op; the existing bytes are trusted to match because the digest is
/// collision resistant. Two processes racing on the same digest both write
/// identical content, so whichever rename lands last is equally valid.
pub struct BlobStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl BlobStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// The blob directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a blob relative to the blob directory.
    pub fn relative_path(digest: &Digest) -> PathBuf {
        let hex = digest.to_hex();
        PathBuf::from(digest.algorithm()).join(&hex[..2]).join(hex)
    }

    /// Relative path rendered with `/` separators, as recorded in descriptors.
    pub fn relative_name(digest: &Digest) -> String {
        let hex = digest.to_hex();
        format!("{}/{}/{}", digest.algorithm(), &hex[..2], hex)
    }

    /// Absolute location of a blob.
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(Self::relative_path(digest))
    }

    /// Whether a blob with this digest is stored.
    pub fn contains(&self, digest: &Digest) -> StoreResult<bool> {
        self.fs.exists(&self.blob_path(digest))
    }

    /// Store content under its digest. Returns `true` if bytes were written,
    /// `false` if the blob was already present.
    ///
    /// The content is not re-hashed; the caller vouches that `digest` is the
    /// SHA-256 of what `content` yields.
    pub fn put(&self, digest: &Digest, content: &mut dyn Read) -> StoreResult<bool> {
        if self.contains(digest)? {
            debug!(digest = %digest.short_hex(), "blob already stored");
            return Ok(false);
        }
        let written = self.fs.write_atomic(&self.blob_path(digest), content)?;
        debug!(digest = %digest.short_hex(), bytes = written, "blob stored");
        Ok(true)
    }

    /// Open a stored blob for reading.
    pub fn open(&self, digest: &Digest) -> StoreResult<Box<dyn Read + Send + '_>> {
        self.fs.open(&self.blob_path(digest))
    }

    /// Digests of all stored blobs, sorted.
    pub fn list(&self) -> StoreResult<Vec<Digest>> {
        if !self.fs.exists(&self.root)? {
            return Ok(Vec::new());
        }
        let mut digests: Vec<Digest> = self
            .fs
            .walk(&self.root)?
            .into_iter()
            .filter(|e| e.metadata.is_file())
            .filter_map(|e| {
                let name = e.path.file_name()?.to_str()?;
                Digest::from_hex(name).ok()
            })
            .collect();
        digests.sort();
        Ok(digests)
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore").field("root", &self.root).finish()
    }
}
