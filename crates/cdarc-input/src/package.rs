//! Deterministic tar packaging of directory trees.
//!
//! Every header is normalized so that the byte stream only depends on the
//! relative paths, the executable bit and the file contents: mtime, uid and
//! gid are zero, owner names are empty, and entries are written in sorted
//! path order.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cdarc_store::{FileMetadata, FileSystem};
use glob::Pattern;
use tar::{EntryType, Header};
use tracing::debug;

use crate::error::{InputError, InputResult};

/// Mode recorded for directories and executable files.
const MODE_EXECUTABLE: u32 = 0o755;
/// Mode recorded for every other file.
const MODE_REGULAR: u32 = 0o644;

/// Parsed exclude pattern.
///
/// A walked entry is excluded if the pattern matches its path relative to
/// the packaged root, or just its file name. Excluding a directory excludes
/// everything below it.
#[derive(Clone, Debug)]
pub struct Exclude {
    pattern: Pattern,
}

impl Exclude {
    pub fn new(pattern: &str) -> InputResult<Self> {
        let pattern = Pattern::new(pattern).map_err(|e| InputError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, relative: &Path) -> bool {
        if self.pattern.matches(&tar_name(relative)) {
            return true;
        }
        relative
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.pattern.matches(n))
    }
}

/// Normalized tar mode for a walked node.
fn normalized_mode(meta: &FileMetadata) -> u32 {
    if meta.is_dir() || meta.mode & 0o111 != 0 {
        MODE_EXECUTABLE
    } else {
        MODE_REGULAR
    }
}

/// Relative path with `/` separators.
fn tar_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn header(kind: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Write the tree below `root` as a tar stream into `out` and return the
/// writer once the archive trailer has been written.
pub fn package_dir<W: Write>(
    fs: &dyn FileSystem,
    root: &Path,
    exclude: Option<&Exclude>,
    out: W,
) -> InputResult<W> {
    let entries = fs
        .walk(root)
        .map_err(|e| InputError::from_store(root, e))?;

    let mut builder = tar::Builder::new(out);
    let mut pruned: Vec<PathBuf> = Vec::new();
    let mut packaged = 0usize;

    for entry in entries {
        if pruned.iter().any(|p| entry.path.starts_with(p)) {
            continue;
        }
        if exclude.is_some_and(|x| x.matches(&entry.path)) {
            if entry.metadata.is_dir() {
                pruned.push(entry.path.clone());
            }
            continue;
        }

        let name = tar_name(&entry.path);
        let mode = normalized_mode(&entry.metadata);
        let full = root.join(&entry.path);
        if entry.metadata.is_dir() {
            let mut h = header(EntryType::Directory, mode, 0);
            builder
                .append_data(&mut h, format!("{name}/"), io::empty())
                .map_err(|e| InputError::packaging(&full, e))?;
        } else {
            let reader = fs.open(&full).map_err(|e| InputError::from_store(&full, e))?;
            let mut h = header(EntryType::Regular, mode, entry.metadata.size);
            builder
                .append_data(&mut h, &name, reader)
                .map_err(|e| InputError::packaging(&full, e))?;
        }
        packaged += 1;
    }

    let out = builder
        .into_inner()
        .map_err(|e| InputError::packaging(root, e))?;
    debug!(path = %root.display(), entries = packaged, "directory packaged");
    Ok(out)
}
