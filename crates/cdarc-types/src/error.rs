use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("the resource {name:?} defines both input and access; only one is allowed")]
    ConflictingResourceSource { name: String },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
