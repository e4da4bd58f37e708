//! Foundation types for component archives.
//!
//! This crate provides the descriptor data model shared by every other
//! `cdarc` crate.
//!
//! # Key Types
//!
//! - [`ComponentDescriptor`] -- versioned component metadata with its resources,
//!   sources and component references
//! - [`Identity`] -- the (name, version, type, extraIdentity) key of every entry
//! - [`ResourceTemplate`] / [`ResourceSource`] -- caller documents, `access` XOR `input`
//! - [`RepositoryContext`] -- registry locations attached to a descriptor
//! - [`Digest`] -- SHA-256 content address of a blob

pub mod descriptor;
pub mod digest;
pub mod error;
pub mod identity;
pub mod repository;
pub mod template;

pub use descriptor::{
    Access, ComponentDescriptor, ComponentReference, ComponentSpec, Metadata, Provider, Relation,
    Resource, Source, SourceRef, LOCAL_FILESYSTEM_BLOB_TYPE, OCI_REGISTRY_TYPE, SCHEMA_VERSION,
};
pub use digest::{BlobInfo, Digest};
pub use error::{TypeError, TypeResult};
pub use identity::{ExtraIdentity, Identifiable, Identity, IdentityObjectMeta, Label};
pub use repository::{add_repository_context, RepositoryContext};
pub use template::{BlobInput, InputKind, ResourceSource, ResourceTemplate};
