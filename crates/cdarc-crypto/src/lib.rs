//! Content digests for component archives.
//!
//! Blobs are addressed by the SHA-256 of their stored bytes. The hashers here
//! work on streams, so large inputs are digested without being buffered.

pub mod hasher;

pub use hasher::{digest_bytes, digest_reader, ContentHasher, DigestingReader, DigestingWriter};
