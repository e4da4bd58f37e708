use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use cdarc_crypto::{digest_reader, DigestingWriter};
use cdarc_store::FileSystem;
use cdarc_types::{BlobInfo, BlobInput, Digest, InputKind, ResourceSource, ResourceTemplate};
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::SpooledTempFile;
use tracing::debug;

use crate::error::{InputError, InputResult};
use crate::package::{package_dir, Exclude};

/// Media type of a plain file.
pub const MEDIA_TYPE_OCTET_STREAM: &str = "application/octet-stream";
/// Media type of a packaged directory.
pub const MEDIA_TYPE_TAR: &str = "application/x-tar";
/// Media type of any gzip-compressed input.
pub const MEDIA_TYPE_GZIP: &str = "application/gzip";

/// Bytes of packaged content held in memory before spilling to a temp file.
pub const DEFAULT_SPOOL_THRESHOLD: usize = 8 * 1024 * 1024;

/// Content-addressed content ready to be stored.
///
/// The digest and size describe exactly the bytes `content` yields.
pub struct ResolvedBlob<'fs> {
    pub digest: Digest,
    pub size: u64,
    pub media_type: String,
    pub content: Box<dyn Read + Send + 'fs>,
}

impl ResolvedBlob<'_> {
    pub fn info(&self) -> BlobInfo {
        BlobInfo {
            media_type: self.media_type.clone(),
            digest: self.digest,
            size: self.size,
        }
    }
}

impl std::fmt::Debug for ResolvedBlob<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedBlob")
            .field("digest", &self.digest)
            .field("size", &self.size)
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// Turns `input` blocks into digested byte streams.
///
/// Relative input paths resolve against `base_dir`, normally the directory
/// of the template file. Nothing is written to the archive; the caller
/// decides what to do with the returned stream.
pub struct BlobResolver<'fs> {
    fs: &'fs dyn FileSystem,
    base_dir: PathBuf,
    spool_threshold: usize,
}

impl<'fs> BlobResolver<'fs> {
    pub fn new(fs: &'fs dyn FileSystem, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base_dir: base_dir.into(),
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
        }
    }

    /// Set the in-memory spool size for packaged content (builder style).
    pub fn with_spool_threshold(mut self, bytes: usize) -> Self {
        self.spool_threshold = bytes;
        self
    }

    /// Where an input path points to.
    pub fn input_path(&self, input: &BlobInput) -> PathBuf {
        if input.path.is_absolute() {
            input.path.clone()
        } else {
            self.base_dir.join(&input.path)
        }
    }

    /// Resolve the content of a resource template, if it has an `input`.
    ///
    /// Templates that set both `access` and `input` are rejected.
    pub fn resolve_template(
        &self,
        template: &ResourceTemplate,
    ) -> InputResult<Option<ResolvedBlob<'fs>>> {
        match template.source()? {
            Some(ResourceSource::Input(input)) => self.resolve(&input).map(Some),
            Some(ResourceSource::Access(_)) | None => Ok(None),
        }
    }

    /// Resolve a single input.
    pub fn resolve(&self, input: &BlobInput) -> InputResult<ResolvedBlob<'fs>> {
        let path = self.input_path(input);
        let meta = self
            .fs
            .stat(&path)
            .map_err(|e| InputError::from_store(&path, e))?
            .ok_or_else(|| InputError::NotFound(path.clone()))?;

        let (mut blob, default_media_type) = match input.kind {
            InputKind::File => {
                if meta.is_dir() {
                    return Err(InputError::Unreadable {
                        path,
                        reason: "expected a file, found a directory".into(),
                    });
                }
                if input.compress {
                    (self.compress_file(&path)?, MEDIA_TYPE_GZIP)
                } else {
                    (self.plain_file(&path)?, MEDIA_TYPE_OCTET_STREAM)
                }
            }
            InputKind::Dir => {
                if !meta.is_dir() {
                    return Err(InputError::Unreadable {
                        path,
                        reason: "expected a directory".into(),
                    });
                }
                let exclude = input.exclude.as_deref().map(Exclude::new).transpose()?;
                let blob = self.package(&path, exclude.as_ref(), input.compress)?;
                let media_type = if input.compress {
                    MEDIA_TYPE_GZIP
                } else {
                    MEDIA_TYPE_TAR
                };
                (blob, media_type)
            }
        };
        blob.media_type = input
            .media_type
            .clone()
            .unwrap_or_else(|| default_media_type.to_string());

        debug!(
            path = %path.display(),
            digest = %blob.digest.short_hex(),
            size = blob.size,
            media_type = %blob.media_type,
            "input resolved"
        );
        Ok(blob)
    }

    /// Digest the file in one streaming pass, then reopen it for the caller.
    fn plain_file(&self, path: &Path) -> InputResult<ResolvedBlob<'fs>> {
        let reader = self
            .fs
            .open(path)
            .map_err(|e| InputError::from_store(path, e))?;
        let (digest, size) = digest_reader(reader).map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let content = self
            .fs
            .open(path)
            .map_err(|e| InputError::from_store(path, e))?;
        Ok(ResolvedBlob {
            digest,
            size,
            media_type: String::new(),
            content,
        })
    }

    fn compress_file(&self, path: &Path) -> InputResult<ResolvedBlob<'fs>> {
        let mut reader = self
            .fs
            .open(path)
            .map_err(|e| InputError::from_store(path, e))?;
        let mut gz = GzEncoder::new(self.spool(), Compression::default());
        io::copy(&mut reader, &mut gz).map_err(|e| InputError::packaging(path, e))?;
        let sink = gz.finish().map_err(|e| InputError::packaging(path, e))?;
        self.rewind(path, sink)
    }

    fn package(
        &self,
        root: &Path,
        exclude: Option<&Exclude>,
        compress: bool,
    ) -> InputResult<ResolvedBlob<'fs>> {
        let sink = if compress {
            let gz = GzEncoder::new(self.spool(), Compression::default());
            package_dir(self.fs, root, exclude, gz)?
                .finish()
                .map_err(|e| InputError::packaging(root, e))?
        } else {
            package_dir(self.fs, root, exclude, self.spool())?
        };
        self.rewind(root, sink)
    }

    fn spool(&self) -> DigestingWriter<SpooledTempFile> {
        DigestingWriter::new(SpooledTempFile::new(self.spool_threshold))
    }

    fn rewind(
        &self,
        path: &Path,
        sink: DigestingWriter<SpooledTempFile>,
    ) -> InputResult<ResolvedBlob<'fs>> {
        let (mut spool, digest, size) = sink.finish();
        spool
            .flush()
            .and_then(|_| spool.rewind())
            .map_err(|e| InputError::packaging(path, e))?;
        Ok(ResolvedBlob {
            digest,
            size,
            media_type: String::new(),
            content: Box::new(spool),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdarc_crypto::digest_bytes;
    use cdarc_store::{InMemoryFileSystem, OsFileSystem};
    use cdarc_types::{Access, IdentityObjectMeta, Relation, Resource};
    use flate2::read::GzDecoder;

    fn read_all(mut blob: ResolvedBlob<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        blob.content.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn file_digest_matches_content() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("tmpl/config.json", r#"{"a":1}"#, 0o644);
        let resolver = BlobResolver::new(&fs, "tmpl");
        let blob = resolver.resolve(&BlobInput::file("config.json")).unwrap();
        assert_eq!(blob.digest, digest_bytes(br#"{"a":1}"#));
        assert_eq!(blob.size, 7);
        assert_eq!(blob.media_type, MEDIA_TYPE_OCTET_STREAM);
        assert_eq!(read_all(blob), br#"{"a":1}"#);
    }

    #[test]
    fn absolute_paths_ignore_base_dir() {
        let resolver_fs = InMemoryFileSystem::new();
        resolver_fs.add_file("/data/blob.bin", "x", 0o644);
        let resolver = BlobResolver::new(&resolver_fs, "elsewhere");
        assert_eq!(
            resolver.input_path(&BlobInput::file("/data/blob.bin")),
            PathBuf::from("/data/blob.bin")
        );
        assert!(resolver.resolve(&BlobInput::file("/data/blob.bin")).is_ok());
    }

    #[test]
    fn missing_input_is_not_found() {
        let fs = InMemoryFileSystem::new();
        let resolver = BlobResolver::new(&fs, "tmpl");
        assert!(matches!(
            resolver.resolve(&BlobInput::file("nope")),
            Err(InputError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve(&BlobInput::dir("nope")),
            Err(InputError::NotFound(_))
        ));
    }

    #[test]
    fn kind_mismatch_is_unreadable() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("tmpl/dir/f", "x", 0o644);
        let resolver = BlobResolver::new(&fs, "tmpl");
        assert!(matches!(
            resolver.resolve(&BlobInput::file("dir")),
            Err(InputError::Unreadable { .. })
        ));
        assert!(matches!(
            resolver.resolve(&BlobInput::dir("dir/f")),
            Err(InputError::Unreadable { .. })
        ));
    }

    #[test]
    fn compressed_file_digest_covers_gzip_bytes() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("f.txt", "hello hello hello", 0o644);
        let resolver = BlobResolver::new(&fs, "");
        let blob = resolver
            .resolve(&BlobInput::file("f.txt").compressed())
            .unwrap();
        assert_eq!(blob.media_type, MEDIA_TYPE_GZIP);
        let digest = blob.digest;
        let bytes = read_all(blob);
        assert_eq!(digest_bytes(&bytes), digest);

        let mut plain = String::new();
        GzDecoder::new(&bytes[..]).read_to_string(&mut plain).unwrap();
        assert_eq!(plain, "hello hello hello");
    }

    #[test]
    fn directory_digest_is_independent_of_insertion_order() {
        let first = InMemoryFileSystem::new();
        first.add_file("tree/a.txt", "a", 0o644);
        first.add_file("tree/sub/b.txt", "b", 0o644);
        first.add_file("tree/z.txt", "z", 0o755);

        let second = InMemoryFileSystem::new();
        second.add_file("tree/z.txt", "z", 0o755);
        second.add_file("tree/sub/b.txt", "b", 0o644);
        second.add_file("tree/a.txt", "a", 0o644);

        let input = BlobInput::dir("tree");
        let a = BlobResolver::new(&first, "").resolve(&input).unwrap();
        let b = BlobResolver::new(&second, "").resolve(&input).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.size, b.size);
        assert_eq!(a.media_type, MEDIA_TYPE_TAR);
    }

    #[test]
    fn directory_digest_changes_with_content() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("tree/a.txt", "a", 0o644);
        let input = BlobInput::dir("tree");
        let before = BlobResolver::new(&fs, "").resolve(&input).unwrap().digest;
        fs.add_file("tree/a.txt", "A", 0o644);
        let after = BlobResolver::new(&fs, "").resolve(&input).unwrap().digest;
        assert_ne!(before, after);
    }

    #[test]
    fn compressed_directory_is_repeatable() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("tree/a.txt", "a", 0o644);
        let input = BlobInput::dir("tree").compressed();
        let resolver = BlobResolver::new(&fs, "");
        let a = resolver.resolve(&input).unwrap();
        let b = resolver.resolve(&input).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.media_type, MEDIA_TYPE_GZIP);
    }

    #[test]
    fn media_type_override() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("chart.tgz", "x", 0o644);
        let mut input = BlobInput::file("chart.tgz");
        input.media_type = Some("application/vnd.cncf.helm.chart.content.v1.tar+gzip".into());
        let blob = BlobResolver::new(&fs, "").resolve(&input).unwrap();
        assert_eq!(blob.media_type, "application/vnd.cncf.helm.chart.content.v1.tar+gzip");
    }

    #[test]
    fn template_with_access_and_input_conflicts() {
        let fs = InMemoryFileSystem::new();
        let template = ResourceTemplate {
            resource: Resource::new(IdentityObjectMeta::new("r", "1.0.0", "blob"), Relation::Local)
                .with_access(Access::oci_registry("r/x:1")),
            input: Some(BlobInput::file("x")),
        };
        let resolver = BlobResolver::new(&fs, "");
        assert!(matches!(
            resolver.resolve_template(&template),
            Err(InputError::ConflictingSource(_))
        ));
    }

    #[test]
    fn template_with_access_needs_no_blob() {
        let fs = InMemoryFileSystem::new();
        let template = ResourceTemplate::from(
            Resource::new(IdentityObjectMeta::new("img", "1.0.0", "ociImage"), Relation::External)
                .with_access(Access::oci_registry("r/img:1")),
        );
        assert!(BlobResolver::new(&fs, "")
            .resolve_template(&template)
            .unwrap()
            .is_none());
    }

    #[test]
    fn large_directory_spills_to_disk_with_same_digest() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("nested/big.bin"), vec![7u8; 64 * 1024]).unwrap();
        std::fs::write(tree.join("small.txt"), b"small").unwrap();

        let input = BlobInput::dir(&tree);
        let in_memory = BlobResolver::new(&OsFileSystem, dir.path())
            .resolve(&input)
            .unwrap();
        let spilled = BlobResolver::new(&OsFileSystem, dir.path())
            .with_spool_threshold(1024)
            .resolve(&input)
            .unwrap();
        assert_eq!(in_memory.digest, spilled.digest);

        let digest = spilled.digest;
        assert_eq!(digest_bytes(&read_all(spilled)), digest);
    }
}
