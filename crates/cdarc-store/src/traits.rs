use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// What kind of node a path refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Dir,
}

/// The subset of file metadata archives care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub kind: FileKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Unix permission bits (`0o644`, `0o755`, ...).
    pub mode: u32,
}

impl FileMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// One node found by [`FileSystem::walk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walked root.
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

/// Storage capabilities an archive needs: stat, read, atomic write, walk.
///
/// All implementations must satisfy these invariants:
/// - `write_atomic` either replaces the target completely or leaves the
///   previous content untouched. Readers never observe a partial file.
/// - `walk` returns every node below the root (not the root itself), sorted by
///   path, so callers get the same order on every run.
/// - All I/O errors are propagated, never silently ignored.
pub trait FileSystem: Send + Sync {
    /// Metadata of a path, or `Ok(None)` if nothing exists there.
    fn stat(&self, path: &Path) -> StoreResult<Option<FileMetadata>>;

    /// Open a file for streaming reads.
    fn open(&self, path: &Path) -> StoreResult<Box<dyn Read + Send + '_>>;

    /// Stream `content` into `path`, atomically replacing any previous file.
    /// Parent directories are created as needed. Returns the number of bytes
    /// written.
    fn write_atomic(&self, path: &Path, content: &mut dyn Read) -> StoreResult<u64>;

    /// Create a directory and all of its missing parents.
    fn create_dir_all(&self, path: &Path) -> StoreResult<()>;

    /// Recursively list the tree below `root`.
    fn walk(&self, root: &Path) -> StoreResult<Vec<WalkEntry>>;

    /// Read a whole file into memory.
    fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| StoreError::io(path, e))?;
        Ok(data)
    }

    /// Atomically write an in-memory buffer.
    fn write_bytes_atomic(&self, path: &Path, data: &[u8]) -> StoreResult<u64> {
        self.write_atomic(path, &mut Cursor::new(data))
    }

    /// Check whether anything exists at `path`.
    fn exists(&self, path: &Path) -> StoreResult<bool> {
        Ok(self.stat(path)?.is_some())
    }
}
