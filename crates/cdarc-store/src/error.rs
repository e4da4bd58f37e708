use std::path::PathBuf;

/// Errors from filesystem and blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested path does not exist.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// A directory was expected but something else is at the path.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// A file was expected but a directory is at the path.
    #[error("{0} is a directory")]
    IsADirectory(PathBuf),

    /// I/O error from the underlying storage backend.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or atomically replacing a file failed. The previous content, if
    /// any, is left untouched.
    #[error("unable to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walking a directory tree failed (permissions, symlink loops).
    #[error("unable to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path.into());
        }
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
