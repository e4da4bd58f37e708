//! Merge engine for component archives.
//!
//! Applies an incoming entry to a descriptor collection by identity: the entry
//! is appended if its identity is new, otherwise it is merged field by field
//! into the existing entry, which keeps its position.
//!
//! # Key Types
//!
//! - [`Mergeable`] -- field-level merge rule of resources, sources and references
//! - [`DescriptorEntry`] -- selects the descriptor collection an entry lives in
//! - [`MergeOutcome`] -- whether an upsert inserted or updated, and where
//!
//! # Field rule
//!
//! The merged entry keeps the incoming identity. Every other field is taken
//! from the incoming entry if it is set (non-empty string, non-empty list,
//! `Some`), else from the existing entry. A partial document can therefore
//! update a single field, e.g. only `access`, and leave the rest untouched.

pub mod entry;
pub mod error;
pub mod merge;

pub use entry::{merge_into_descriptor, DescriptorEntry};
pub use error::{MergeError, MergeResult};
pub use merge::{find_index, merge, upsert, MergeOutcome, Mergeable};
