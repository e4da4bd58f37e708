use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{FileKind, FileMetadata, FileSystem, WalkEntry};

#[derive(Clone, Debug)]
enum Node {
    File { data: Vec<u8>, mode: u32 },
    Dir,
}

/// In-memory, map-based [`FileSystem`].
///
/// Intended for tests and embedding. Paths are normalized lexically (`.`
/// components dropped, `..` resolved) so `./a/b` and `a/b` name the same
/// node. Writes are trivially atomic: the new content replaces the old under
/// a single lock.
pub struct InMemoryFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl InMemoryFileSystem {
    /// Create a new empty filesystem.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add a file with the given mode, creating parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>, mode: u32) {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.write().expect("lock poisoned");
        insert_parents(&mut nodes, &path);
        nodes.insert(
            path,
            Node::File {
                data: data.into(),
                mode,
            },
        );
    }

    /// Number of regular files below `root` (recursively).
    pub fn file_count(&self, root: impl AsRef<Path>) -> usize {
        let root = normalize(root.as_ref());
        self.nodes
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|(p, n)| matches!(n, Node::File { .. }) && p.starts_with(&root) && **p != root)
            .count()
    }
}

fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    let mut parent = path.parent();
    while let Some(p) = parent {
        if p.as_os_str().is_empty() {
            break;
        }
        nodes.entry(p.to_path_buf()).or_insert(Node::Dir);
        parent = p.parent();
    }
}

fn metadata(node: &Node) -> FileMetadata {
    match node {
        Node::File { data, mode } => FileMetadata {
            kind: FileKind::File,
            size: data.len() as u64,
            mode: *mode,
        },
        Node::Dir => FileMetadata {
            kind: FileKind::Dir,
            size: 0,
            mode: 0o755,
        },
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for InMemoryFileSystem {
    fn stat(&self, path: &Path) -> StoreResult<Option<FileMetadata>> {
        let path = normalize(path);
        if path.as_os_str().is_empty() || path == Path::new("/") {
            return Ok(Some(metadata(&Node::Dir)));
        }
        let nodes = self.nodes.read().expect("lock poisoned");
        Ok(nodes.get(&path).map(metadata))
    }

    fn open(&self, path: &Path) -> StoreResult<Box<dyn Read + Send + '_>> {
        let key = normalize(path);
        let nodes = self.nodes.read().expect("lock poisoned");
        match nodes.get(&key) {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir) => Err(StoreError::IsADirectory(path.to_path_buf())),
            None => Err(StoreError::NotFound(path.to_path_buf())),
        }
    }

    fn write_atomic(&self, path: &Path, content: &mut dyn Read) -> StoreResult<u64> {
        let key = normalize(path);
        // Buffer first so a failing reader leaves the previous content in place.
        let mut data = Vec::new();
        content
            .read_to_end(&mut data)
            .map_err(|source| StoreError::Persistence {
                path: path.to_path_buf(),
                source,
            })?;
        let written = data.len() as u64;
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if let Some(Node::Dir) = nodes.get(&key) {
            return Err(StoreError::IsADirectory(path.to_path_buf()));
        }
        let mode = match nodes.get(&key) {
            Some(Node::File { mode, .. }) => *mode,
            _ => 0o644,
        };
        insert_parents(&mut nodes, &key);
        nodes.insert(key, Node::File { data, mode });
        Ok(written)
    }

    fn create_dir_all(&self, path: &Path) -> StoreResult<()> {
        let key = normalize(path);
        if key.as_os_str().is_empty() {
            return Ok(());
        }
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get(&key) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File { .. }) => Err(StoreError::NotADirectory(path.to_path_buf())),
            None => {
                insert_parents(&mut nodes, &key);
                nodes.insert(key, Node::Dir);
                Ok(())
            }
        }
    }

    fn walk(&self, root: &Path) -> StoreResult<Vec<WalkEntry>> {
        let key = normalize(root);
        match self.stat(&key)? {
            None => return Err(StoreError::NotFound(root.to_path_buf())),
            Some(meta) if !meta.is_dir() => {
                return Err(StoreError::NotADirectory(root.to_path_buf()))
            }
            Some(_) => {}
        }
        let nodes = self.nodes.read().expect("lock poisoned");
        let mut entries: Vec<WalkEntry> = nodes
            .iter()
            .filter_map(|(path, node)| {
                let relative = path.strip_prefix(&key).ok()?;
                if relative.as_os_str().is_empty() {
                    return None;
                }
                Some(WalkEntry {
                    path: relative.to_path_buf(),
                    metadata: metadata(node),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

impl std::fmt::Debug for InMemoryFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.nodes.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryFileSystem")
            .field("node_count", &count)
            .finish()
    }
}
