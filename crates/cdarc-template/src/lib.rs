//! Multi-document template decoding.
//!
//! Entry templates arrive as a stream of YAML documents separated by `---`,
//! or as concatenated JSON objects. [`decode`] turns one stream into a lazy
//! sequence of typed documents; a malformed document ends the sequence with
//! an error carrying its 1-based position.
//!
//! A command can read templates from two origins: a template file and piped
//! input. [`ordered_sources`] fixes their order (file first), and
//! [`TemplateSource::piped`] drops a pipe that carried nothing. The caller
//! passes the piped reader in explicitly; nothing here touches process-wide
//! stdin.

pub mod decoder;
pub mod error;
pub mod source;

pub use decoder::{decode, Documents, Format};
pub use error::{TemplateError, TemplateResult};
pub use source::{ordered_sources, TemplateSource, PIPED_ORIGIN};
