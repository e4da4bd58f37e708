//! Blob resolver for component archives.
//!
//! Turns the `input` block of a resource template into content-addressed
//! bytes: a file is digested as-is (or gzipped first), a directory is
//! packaged into a deterministic tar stream (optionally gzipped) and then
//! digested. The digest always describes the exact bytes that get stored.
//!
//! # Key Types
//!
//! - [`BlobResolver`] -- resolves inputs against a base directory
//! - [`ResolvedBlob`] -- digest, size, media type and a reader of the content
//! - [`Exclude`] -- glob pattern of directory entries to leave out
//!
//! Packaged content is spooled through a [`tempfile::SpooledTempFile`], so
//! small trees stay in memory and large ones spill to disk.

pub mod error;
pub mod package;
pub mod resolver;

pub use error::{InputError, InputResult};
pub use package::{package_dir, Exclude};
pub use resolver::{
    BlobResolver, ResolvedBlob, DEFAULT_SPOOL_THRESHOLD, MEDIA_TYPE_GZIP, MEDIA_TYPE_OCTET_STREAM,
    MEDIA_TYPE_TAR,
};
