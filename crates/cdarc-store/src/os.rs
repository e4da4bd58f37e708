use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::{FileKind, FileMetadata, FileSystem, WalkEntry};

/// [`FileSystem`] backed by the host operating system.
///
/// Atomic writes go to a temporary file in the target's directory, are
/// fsynced, and are then renamed over the target.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn to_metadata(meta: &fs::Metadata) -> FileMetadata {
    let kind = if meta.is_dir() {
        FileKind::Dir
    } else {
        FileKind::File
    };
    FileMetadata {
        kind,
        size: if meta.is_dir() { 0 } else { meta.len() },
        mode: mode_bits(meta),
    }
}

#[cfg(unix)]
fn mode_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// Mode of files created by [`OsFileSystem::write_atomic`].
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Give the temporary file the mode of the file it replaces, or
/// [`DEFAULT_FILE_MODE`] for new files.
#[cfg(unix)]
fn set_file_mode(tmp: &File, target: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = match fs::metadata(target) {
        Ok(meta) => meta.permissions().mode() & 0o7777,
        Err(e) if e.kind() == io::ErrorKind::NotFound => DEFAULT_FILE_MODE,
        Err(e) => return Err(e),
    };
    tmp.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_tmp: &File, _target: &Path) -> io::Result<()> {
    Ok(())
}

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> StoreResult<Option<FileMetadata>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(to_metadata(&meta))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn open(&self, path: &Path) -> StoreResult<Box<dyn Read + Send + '_>> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        if file
            .metadata()
            .map_err(|e| StoreError::io(path, e))?
            .is_dir()
        {
            return Err(StoreError::IsADirectory(path.to_path_buf()));
        }
        Ok(Box::new(file))
    }

    fn write_atomic(&self, path: &Path, content: &mut dyn Read) -> StoreResult<u64> {
        let persistence = |source: io::Error| StoreError::Persistence {
            path: path.to_path_buf(),
            source,
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(persistence)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(persistence)?;
        let written = io::copy(content, &mut tmp).map_err(persistence)?;
        tmp.flush().map_err(persistence)?;
        set_file_mode(tmp.as_file(), path).map_err(persistence)?;
        tmp.as_file().sync_all().map_err(persistence)?;
        tmp.persist(path).map_err(|e| persistence(e.error))?;
        debug!(path = %path.display(), bytes = written, "file replaced atomically");
        Ok(written)
    }

    fn create_dir_all(&self, path: &Path) -> StoreResult<()> {
        if let Some(meta) = self.stat(path)? {
            if !meta.is_dir() {
                return Err(StoreError::NotADirectory(path.to_path_buf()));
            }
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
    }

    fn walk(&self, root: &Path) -> StoreResult<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        // Following links makes walkdir detect symlink loops and report them.
        for entry in WalkDir::new(root).follow_links(true).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Walk {
                path: e.path().unwrap_or(root).to_path_buf(),
                reason: e.to_string(),
            })?;
            let meta = entry.metadata().map_err(|e| StoreError::Walk {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| StoreError::Walk {
                    path: entry.path().to_path_buf(),
                    reason: e.to_string(),
                })?
                .to_path_buf();
            entries.push(WalkEntry {
                path: relative,
                metadata: to_metadata(&meta),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OsFileSystem.stat(&dir.path().join("missing")).unwrap().is_none());
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/file.txt");
        OsFileSystem.write_bytes_atomic(&path, b"first").unwrap();
        OsFileSystem.write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // No temporary files are left next to the target.
        let siblings: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(siblings.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_sets_and_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("component-descriptor.yaml");
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o7777;

        OsFileSystem.write_bytes_atomic(&path, b"first").unwrap();
        assert_eq!(mode(&path), DEFAULT_FILE_MODE);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();
        OsFileSystem.write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(mode(&path), 0o664);
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn create_dir_all_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        fs::write(&path, b"x").unwrap();
        let err = OsFileSystem.create_dir_all(&path).unwrap_err();
        assert!(matches!(err, StoreError::NotADirectory(_)));
    }

    #[test]
    fn open_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            OsFileSystem.open(dir.path()),
            Err(StoreError::IsADirectory(_))
        ));
    }

    #[test]
    fn open_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            OsFileSystem.open(&dir.path().join("nope")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn walk_is_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/sub")).unwrap();
        fs::write(dir.path().join("b/sub/z.txt"), b"z").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("c.txt"), b"cc").unwrap();

        let entries = OsFileSystem.walk(dir.path()).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("a.txt").to_path_buf(),
                Path::new("b").to_path_buf(),
                Path::new("b/sub").to_path_buf(),
                Path::new("b/sub/z.txt").to_path_buf(),
                Path::new("c.txt").to_path_buf(),
            ]
        );
        assert!(entries[1].metadata.is_dir());
        assert_eq!(entries[4].metadata.size, 2);
    }

    #[cfg(unix)]
    #[test]
    fn walk_reports_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("d")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("d/loop")).unwrap();
        let err = OsFileSystem.walk(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Walk { .. }));
    }
}
