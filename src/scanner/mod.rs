//! Scanner module for directory listing and file fingerprinting.
//!
//! This module provides functionality for:
//! - Flat, name-sorted listing of the regular files in a directory
//! - Fuzzy-hash fingerprints (ssdeep) paired with file sizes
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory listing and file discovery
//! - [`hasher`]: Fuzzy hashing and fingerprint extraction
//!
//! # Example
//!
//! ```no_run
//! use neardupe::scanner::{list_directory, Fingerprinter};
//! use std::path::Path;
//!
//! let records = list_directory(Path::new("."), false).unwrap();
//! let fingerprinter = Fingerprinter::default();
//! for record in &records {
//!     match fingerprinter.extract(&record.path) {
//!         Ok(fp) => println!("{}: {} ({} bytes)", record.name, fp.hash, fp.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

// Re-export main types
pub use hasher::{DigestError, Fingerprint, Fingerprinter, FuzzyHasher, SsdeepHasher};
pub use walker::list_directory;

/// A file discovered by the directory listing.
///
/// The position of a record in the listing is its canonical index for the
/// whole run. Records are ordered by name ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// File name (last path component)
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
}

impl FileRecord {
    /// Create a new FileRecord.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Errors that can occur while listing the target directory.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while fingerprinting a single file.
///
/// These are per-file failures: the finder isolates them and keeps going
/// unless strict mode is enabled.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Another file in the run is reported under the same name. Happens when
    /// distinct non-UTF-8 names collapse to one display name.
    #[error("Duplicate file name '{name}': {path}")]
    DuplicateName {
        /// Path of the file left out
        path: PathBuf,
        /// The colliding display name
        name: String,
    },

    /// The fuzzy-hash primitive refused the file content.
    #[error("Fuzzy hash rejected {path}: {reason}")]
    Rejected {
        /// Path of the rejected file
        path: PathBuf,
        /// Reason reported by the hashing scheme
        reason: String,
    },
}

impl HashError {
    /// Map an I/O error to the most specific variant for `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io {
                path,
                source: Arc::new(error),
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) => path,
            Self::Io { path, .. }
            | Self::DuplicateName { path, .. }
            | Self::Rejected { path, .. } => path,
        }
    }

    /// Short, stable name of the failing stage, used in reports.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::Io { .. } => ErrorKind::Io,
            Self::DuplicateName { .. } => ErrorKind::Name,
            Self::Rejected { .. } => ErrorKind::Hashing,
        }
    }
}

/// Category of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The file could not be opened, stat'ed or read.
    Io,
    /// The file name collides with another file's name.
    Name,
    /// The hashing scheme rejected the content.
    Hashing,
}
