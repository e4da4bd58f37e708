//! Storage layer for component archives.
//!
//! Everything that touches persistent storage goes through the [`FileSystem`]
//! capability trait, so archive logic can run against an in-memory tree in
//! tests and against the host filesystem in production.
//!
//! # Backends
//!
//! - [`OsFileSystem`] -- host filesystem, temp-file-and-rename atomic writes
//! - [`InMemoryFileSystem`] -- `BTreeMap`-based tree for tests and embedding
//!
//! # Blob storage
//!
//! [`BlobStore`] lays blobs out content-addressably under a directory, keyed
//! by their SHA-256 digest.
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. Files are replaced atomically: a crash never leaves a half-written file.
//! 3. Directory walks are sorted so every consumer sees a stable order.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod blob;
pub mod error;
pub mod memory;
pub mod os;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::BlobStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryFileSystem;
pub use os::{OsFileSystem, DEFAULT_FILE_MODE};
pub use traits::{FileKind, FileMetadata, FileSystem, WalkEntry};
