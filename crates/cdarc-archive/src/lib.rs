//! Component archive store.
//!
//! A component archive is a directory holding one component descriptor
//! (`component-descriptor.yaml`) and a content-addressable blob directory.
//! This crate owns that representation: it initialises, loads, validates and
//! persists archives, and runs the add pipeline that merges template
//! documents into the descriptor.
//!
//! # Key Types
//!
//! - [`ArchiveStore`] -- init, load, persist, put_blob and the add commands
//! - [`ComponentArchive`] -- a descriptor bound to its archive directory
//! - [`Validator`] / [`DefaultValidator`] -- descriptor schema rules
//! - [`ArchiveConfig`] -- file layout and spooling configuration
//! - [`ArchiveTransport`] -- push/pull seam for registry transports
//!
//! # Commit semantics
//!
//! The add commands commit one document at a time. Each document is merged
//! into a working copy, validated and written atomically before the next one
//! is decoded. A failing document is reported with its position and
//! identity; documents committed before it are not rolled back.

pub mod add;
pub mod config;
pub mod error;
pub mod export;
pub mod store;
pub mod transport;
pub mod validation;

pub use add::{AddReport, CommittedEntry, EntryTemplate, Prepared};
pub use config::{ArchiveConfig, ARCHIVE_PATH_ENV, BLOB_DIR, COMPONENT_DESCRIPTOR_FILE};
pub use error::{ArchiveError, ArchiveResult};
pub use export::ExportFormat;
pub use store::{
    decode_descriptor, encode_descriptor, ArchiveStore, BuilderOptions, ComponentArchive,
    StoredBlob,
};
pub use transport::{ArchiveTransport, InMemoryTransport};
pub use validation::{is_semver, DefaultValidator, EntryRules, SchemaError, Validator};
