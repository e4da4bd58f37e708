use cdarc_types::Identity;
use thiserror::Error;

/// Errors produced by the merge engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// The collection already holds two entries with the incoming identity,
    /// so there is no single entry to merge into.
    #[error("collection already contains {identity} at positions {first} and {second}")]
    DuplicateIdentity {
        identity: Identity,
        first: usize,
        second: usize,
    },
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
