use std::path::PathBuf;

use cdarc_input::InputError;
use cdarc_merge::MergeError;
use cdarc_store::StoreError;
use cdarc_template::TemplateError;
use cdarc_types::{Identity, TypeError};
use thiserror::Error;

use crate::validation::SchemaError;

/// Errors produced by archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No component descriptor exists in the archive directory.
    #[error("no component archive at {0}: component descriptor not found")]
    NotFound(PathBuf),

    /// The archive path exists but is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// The component descriptor exists but cannot be decoded.
    #[error("malformed component descriptor {path}: {reason}")]
    MalformedDescriptor { path: PathBuf, reason: String },

    /// The descriptor or a merged entry violates the schema.
    #[error("invalid component descriptor: {}", join_errors(.0))]
    SchemaValidation(Vec<SchemaError>),

    /// Creating an archive on the fly needs a component name and version.
    #[error("no component archive at {0} and no component name and version given to create one")]
    MissingIdentity(PathBuf),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The descriptor could not be encoded.
    #[error("unable to encode component descriptor: {0}")]
    Encode(String),

    /// The configuration file is invalid.
    #[error("invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// The transport could not push or pull an archive.
    #[error("transport error for {reference}: {reason}")]
    Transport { reference: String, reason: String },

    /// A single template document failed. Documents before it stay committed.
    #[error("document {index} of {origin}{}: {source}", identity_suffix(.identity))]
    Document {
        origin: String,
        index: usize,
        identity: Option<Identity>,
        #[source]
        source: Box<ArchiveError>,
    },
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn identity_suffix(identity: &Option<Identity>) -> String {
    identity
        .as_ref()
        .map(|id| format!(" ({id})"))
        .unwrap_or_default()
}

impl ArchiveError {
    /// The failing document's position, for errors wrapped in [`ArchiveError::Document`].
    pub fn document_index(&self) -> Option<usize> {
        match self {
            Self::Document { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The innermost error, unwrapping any document context.
    pub fn root_cause(&self) -> &ArchiveError {
        match self {
            Self::Document { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
