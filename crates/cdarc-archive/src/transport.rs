//! The seam between local archives and remote registries.
//!
//! A transport reads a fully materialised archive through
//! [`ArchiveStore::load`] and [`ArchiveStore::list_blobs`] when pushing, and
//! writes a pulled archive through [`ArchiveStore::put_blob`] and
//! [`ArchiveStore::persist`]. The registry wire protocol itself lives behind
//! the trait.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;

use cdarc_crypto::DigestingReader;
use cdarc_types::{ComponentDescriptor, Digest};
use tracing::info;

use crate::error::{ArchiveError, ArchiveResult};
use crate::store::{ArchiveStore, ComponentArchive};

/// Pushes archives to and pulls archives from a remote location.
pub trait ArchiveTransport: Send + Sync {
    /// Upload the archive at `root` under `reference`.
    fn push(&self, store: &ArchiveStore, root: &Path, reference: &str) -> ArchiveResult<()>;

    /// Download `reference` into a new archive at `destination`.
    fn pull(
        &self,
        store: &ArchiveStore,
        reference: &str,
        destination: &Path,
    ) -> ArchiveResult<ComponentArchive>;
}

#[derive(Clone, Debug)]
struct Snapshot {
    descriptor: ComponentDescriptor,
    blobs: BTreeMap<Digest, Vec<u8>>,
}

/// A transport that keeps pushed archives in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    artifacts: RwLock<BTreeMap<String, Snapshot>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// References pushed so far, sorted.
    pub fn references(&self) -> Vec<String> {
        self.artifacts
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

fn transport_error(reference: &str, reason: impl ToString) -> ArchiveError {
    ArchiveError::Transport {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

impl ArchiveTransport for InMemoryTransport {
    fn push(&self, store: &ArchiveStore, root: &Path, reference: &str) -> ArchiveResult<()> {
        let archive = store.load(root)?;
        store.check(&archive.descriptor)?;
        let blob_store = store.blob_store(root);
        let mut blobs = BTreeMap::new();
        for digest in blob_store.list()? {
            let mut data = Vec::new();
            let mut reader = DigestingReader::new(blob_store.open(&digest)?);
            reader
                .read_to_end(&mut data)
                .map_err(|e| transport_error(reference, e))?;
            let (actual, _) = reader.finish();
            if actual != digest {
                return Err(transport_error(
                    reference,
                    format!("blob {digest} is corrupt: content hashes to {actual}"),
                ));
            }
            blobs.insert(digest, data);
        }
        let count = blobs.len();
        self.artifacts.write().expect("lock poisoned").insert(
            reference.to_string(),
            Snapshot {
                descriptor: archive.descriptor,
                blobs,
            },
        );
        info!(reference, blobs = count, "component archive pushed");
        Ok(())
    }

    fn pull(
        &self,
        store: &ArchiveStore,
        reference: &str,
        destination: &Path,
    ) -> ArchiveResult<ComponentArchive> {
        let snapshot = self
            .artifacts
            .read()
            .expect("lock poisoned")
            .get(reference)
            .cloned()
            .ok_or_else(|| transport_error(reference, "artifact not found"))?;

        store.fs().create_dir_all(destination)?;
        let archive = ComponentArchive::new(destination, snapshot.descriptor);
        for (digest, data) in &snapshot.blobs {
            store.put_blob(&archive, digest, &mut data.as_slice())?;
        }
        store.persist(&archive)?;
        info!(reference, path = %destination.display(), "component archive pulled");
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdarc_crypto::digest_bytes;
    use cdarc_store::InMemoryFileSystem;
    use std::sync::Arc;

    #[test]
    fn push_then_pull_round_trips_descriptor_and_blobs() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let store = ArchiveStore::new(fs.clone());
        let archive = store
            .init(Path::new("src"), "example.com/c", "1.0.0", &["r.example".into()])
            .unwrap();
        let digest = digest_bytes(b"payload");
        store.put_blob(&archive, &digest, &mut &b"payload"[..]).unwrap();

        let transport = InMemoryTransport::new();
        transport
            .push(&store, Path::new("src"), "r.example/c:1.0.0")
            .unwrap();
        assert_eq!(transport.references(), vec!["r.example/c:1.0.0"]);

        let pulled = transport
            .pull(&store, "r.example/c:1.0.0", Path::new("dst"))
            .unwrap();
        assert_eq!(pulled.descriptor, archive.descriptor);
        assert_eq!(store.load(Path::new("dst")).unwrap().descriptor, archive.descriptor);
        assert_eq!(store.list_blobs(&pulled).unwrap(), vec![digest]);
    }

    #[test]
    fn push_rejects_corrupt_blob() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let store = ArchiveStore::new(fs.clone());
        let archive = store
            .init(Path::new("src"), "example.com/c", "1.0.0", &[])
            .unwrap();
        let digest = digest_bytes(b"payload");
        let stored = store.put_blob(&archive, &digest, &mut &b"payload"[..]).unwrap();
        fs.add_file(Path::new("src/blobs").join(&stored.filename), "tampered", 0o644);

        let transport = InMemoryTransport::new();
        let err = transport
            .push(&store, Path::new("src"), "r.example/c:1.0.0")
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Transport { .. }));
        assert!(transport.references().is_empty());
    }

    #[test]
    fn pull_unknown_reference() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let store = ArchiveStore::new(fs);
        let err = InMemoryTransport::new()
            .pull(&store, "nothing", Path::new("dst"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Transport { .. }));
    }
}
