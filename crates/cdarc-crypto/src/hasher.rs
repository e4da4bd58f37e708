use std::io::{self, Read, Write};

use cdarc_types::Digest;
use sha2::{Digest as _, Sha256};

/// Incremental SHA-256 hasher that also counts the bytes it has seen.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    size: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.size += data.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Finish hashing, returning the digest and the total size.
    pub fn finalize(self) -> (Digest, u64) {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&self.inner.finalize());
        (Digest::from_hash(hash), self.size)
    }
}

impl Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Digest an in-memory byte slice.
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize().0
}

/// Drain a reader, returning the digest and size of everything it produced.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<(Digest, u64)> {
    let mut hasher = ContentHasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize())
}

/// Writer adapter that hashes every byte on its way to the inner writer.
pub struct DigestingWriter<W> {
    inner: W,
    hasher: ContentHasher,
}

impl<W: Write> DigestingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    /// Unwrap into the inner writer and the digest of what was written.
    pub fn finish(self) -> (W, Digest, u64) {
        let (digest, size) = self.hasher.finalize();
        (self.inner, digest, size)
    }
}

impl<W: Write> Write for DigestingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader adapter that hashes every byte read through it.
pub struct DigestingReader<R> {
    inner: R,
    hasher: ContentHasher,
}

impl<R: Read> DigestingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    /// Digest and size of the bytes read so far.
    pub fn finish(self) -> (Digest, u64) {
        self.hasher.finalize()
    }
}

impl<R: Read> Read for DigestingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
