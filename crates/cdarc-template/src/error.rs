use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading and decoding entry templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file does not exist.
    #[error("template file not found: {0}")]
    NotFound(PathBuf),

    /// The input could not be read.
    #[error("unable to read templates from {origin}: {reason}")]
    Read { origin: String, reason: String },

    /// A document could not be decoded. `index` is the 1-based position of
    /// the document in its stream.
    #[error("malformed template document {index} in {origin}: {reason}")]
    Malformed {
        origin: String,
        index: usize,
        reason: String,
    },
}

impl TemplateError {
    /// Position of the offending document, if the error concerns one.
    pub fn document_index(&self) -> Option<usize> {
        match self {
            Self::Malformed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
