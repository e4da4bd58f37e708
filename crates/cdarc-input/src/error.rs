use std::path::PathBuf;

use cdarc_store::StoreError;
use cdarc_types::TypeError;
use thiserror::Error;

/// Errors produced while resolving local inputs.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input path does not exist.
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    /// The input exists but cannot be read or walked.
    #[error("input {path} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The template sets both an access and an input.
    #[error(transparent)]
    ConflictingSource(#[from] TypeError),

    /// The exclude pattern is not a valid glob.
    #[error("invalid exclude pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Packaging, compressing or spooling the content failed.
    #[error("unable to package {path}: {source}")]
    Packaging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InputError {
    pub(crate) fn from_store(path: &std::path::Path, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(path.to_path_buf()),
            other => Self::Unreadable {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn packaging(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Packaging {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result alias for input resolution.
pub type InputResult<T> = Result<T, InputError>;
