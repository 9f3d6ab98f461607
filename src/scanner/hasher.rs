//! Fuzzy hashing and fingerprint extraction.
//!
//! # Overview
//! A [`Fingerprint`] is the fuzzy-hash digest of a file plus its size. The
//! digest comes from a [`FuzzyHasher`]; the default [`SsdeepHasher`] produces
//! ssdeep-format digests (`blocksize:hash1:hash2`) so that similar inputs
//! produce similar strings.
//!
//! The hashing scheme is an opaque collaborator: anything implementing
//! [`FuzzyHasher`] can be plugged into a [`Fingerprinter`].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use fuzzyhash::FuzzyHash;
use serde::Serialize;

use super::HashError;

/// Digest ssdeep produces for empty input.
pub const EMPTY_DIGEST: &str = "3::";

/// Chunk size used when streaming file content into a hasher.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Failure while streaming content into a [`FuzzyHasher`].
#[derive(thiserror::Error, Debug)]
pub enum DigestError {
    /// The content could not be read.
    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    /// The hashing scheme refused the content.
    #[error("{0}")]
    Rejected(String),
}

/// A content-similarity hashing scheme.
///
/// Implementations must be thread-safe; one instance is shared by every
/// worker of the fingerprinting phase.
pub trait FuzzyHasher: Send + Sync {
    /// Hash `data` into a digest string.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the scheme refuses the input.
    fn hash(&self, data: &[u8]) -> Result<String, String>;

    /// Hash everything `reader` yields.
    ///
    /// The default buffers the whole input and calls [`FuzzyHasher::hash`];
    /// schemes that can digest incrementally should override it so large
    /// files are never held in memory.
    ///
    /// # Errors
    ///
    /// - `DigestError::Read` if the reader fails
    /// - `DigestError::Rejected` if the scheme refuses the content
    fn hash_reader(&self, reader: &mut dyn Read) -> Result<String, DigestError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.hash(&data).map_err(DigestError::Rejected)
    }

    /// Compare two digests with the scheme's own scoring, scaled to `[0, 1]`.
    ///
    /// Returns `None` if the digests cannot be compared (for example
    /// incompatible block sizes or malformed input).
    fn compare(&self, a: &str, b: &str) -> Option<f64>;
}

/// ssdeep context-triggered piecewise hashing via the `fuzzyhash` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsdeepHasher;

impl SsdeepHasher {
    /// Create a new ssdeep hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FuzzyHasher for SsdeepHasher {
    fn hash(&self, data: &[u8]) -> Result<String, String> {
        if data.is_empty() {
            return Ok(EMPTY_DIGEST.to_string());
        }

        let digest = FuzzyHash::new(data).to_string();
        validate_digest(&digest)?;
        Ok(digest)
    }

    fn hash_reader(&self, reader: &mut dyn Read) -> Result<String, DigestError> {
        let mut state = FuzzyHash::default();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut total = 0u64;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DigestError::Read(e)),
            };
            state.update(&buffer[..read]);
            total += read as u64;
        }

        if total == 0 {
            return Ok(EMPTY_DIGEST.to_string());
        }

        state.finalize();
        let digest = state.to_string();
        validate_digest(&digest).map_err(DigestError::Rejected)?;
        Ok(digest)
    }

    fn compare(&self, a: &str, b: &str) -> Option<f64> {
        // fuzzyhash indexes into the digest parts unchecked
        if validate_digest(a).is_err() || validate_digest(b).is_err() {
            return None;
        }

        FuzzyHash::compare(a, b)
            .ok()
            .map(|score| (f64::from(score) / 100.0).clamp(0.0, 1.0))
    }
}

/// Check that a digest has the `blocksize:hash1:hash2` shape.
pub(crate) fn validate_digest(digest: &str) -> Result<(), String> {
    let mut parts = digest.splitn(3, ':');
    let block_size = parts.next().unwrap_or_default();
    if block_size.parse::<u32>().is_err() || parts.count() != 2 {
        return Err(format!("malformed digest '{digest}'"));
    }
    Ok(())
}

/// Fuzzy-hash digest and size of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    /// Fuzzy-hash digest
    pub hash: String,
    /// File size in bytes
    pub size: u64,
}

impl Fingerprint {
    /// Create a new fingerprint.
    #[must_use]
    pub fn new(hash: impl Into<String>, size: u64) -> Self {
        Self {
            hash: hash.into(),
            size,
        }
    }
}

/// Extracts [`Fingerprint`]s from files using a shared [`FuzzyHasher`].
#[derive(Clone)]
pub struct Fingerprinter {
    hasher: Arc<dyn FuzzyHasher>,
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("hasher", &"<hasher>")
            .finish()
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(Arc::new(SsdeepHasher::new()))
    }
}

impl Fingerprinter {
    /// Create a fingerprinter backed by `hasher`.
    #[must_use]
    pub fn new(hasher: Arc<dyn FuzzyHasher>) -> Self {
        Self { hasher }
    }

    /// The hashing scheme in use.
    #[must_use]
    pub fn hasher(&self) -> &Arc<dyn FuzzyHasher> {
        &self.hasher
    }

    /// Stream `path` once through the hashing scheme and produce its
    /// fingerprint.
    ///
    /// The size comes from a single stat of the opened file and must agree
    /// with the number of bytes actually read.
    ///
    /// # Errors
    ///
    /// - `HashError::NotFound` / `PermissionDenied` / `Io` if the file cannot
    ///   be opened or read, or if it shrank or grew while being read
    /// - `HashError::Rejected` if the hashing scheme refuses the content
    pub fn extract(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        let size = file
            .metadata()
            .map_err(|e| HashError::from_io(path.to_path_buf(), e))?
            .len();

        let mut reader = CountingReader::new(file);
        let digest = match self.hasher.hash_reader(&mut reader) {
            Ok(digest) => Ok(digest),
            Err(DigestError::Read(e)) => return Err(HashError::from_io(path.to_path_buf(), e)),
            Err(DigestError::Rejected(reason)) => Err(reason),
        };

        let read = reader.bytes_read();
        if read != size {
            return Err(HashError::from_io(
                path.to_path_buf(),
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file changed while reading: expected {size} bytes, read {read}"),
                ),
            ));
        }

        let hash = digest.map_err(|reason| HashError::Rejected {
            path: path.to_path_buf(),
            reason,
        })?;

        log::trace!("Fingerprinted {}: {} ({} bytes)", path.display(), hash, size);
        Ok(Fingerprint { hash, size })
    }
}

/// Reader adapter that counts the bytes passing through it.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    fn bytes_read(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
