//! Directory listing for the canonical file index.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which lists the regular files
//! directly inside one directory (no recursion) and returns them sorted by
//! name. The position of each record in that list is the index used by every
//! later phase of a run.
//!
//! # Example
//!
//! ```no_run
//! use neardupe::scanner::walker::Walker;
//! use std::path::Path;
//!
//! let records = Walker::new(Path::new("/home/user/Downloads")).list().unwrap();
//! for record in &records {
//!     println!("{}", record.name);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{FileRecord, ScanError};

/// Lists the regular files of a single directory.
#[derive(Debug)]
pub struct Walker {
    /// Directory to list
    root: PathBuf,
    /// Include symlinks that resolve to regular files
    follow_symlinks: bool,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given directory.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            root: path.to_path_buf(),
            follow_symlinks: false,
            shutdown_flag: None,
        }
    }

    /// Include symbolic links that point at regular files.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set, listing stops early and returns what it has so
    /// far; the caller is expected to check the flag itself afterwards.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Validate the root directory before listing it.
    fn validate_root(&self) -> Result<(), ScanError> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| self.root_error(e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    fn root_error(&self, error: std::io::Error) -> ScanError {
        match error.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(self.root.clone()),
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(self.root.clone()),
            _ => ScanError::Io {
                path: self.root.clone(),
                source: error,
            },
        }
    }

    /// List the regular files of the directory, sorted by name ascending.
    ///
    /// Subdirectories and other non-regular entries are excluded. Entries
    /// whose metadata cannot be read are skipped with a warning; failure to
    /// open the directory itself is an error.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if the directory does not exist, is not a
    /// directory, or cannot be read.
    pub fn list(&self) -> Result<Vec<FileRecord>, ScanError> {
        self.validate_root()?;

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.follow_symlinks);

        let mut records = Vec::new();
        for entry in walker {
            if self.is_shutdown_requested() {
                log::debug!("Listing interrupted by shutdown request");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    return Err(self.root_error(source));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                log::trace!("Skipping non-regular entry: {}", entry.path().display());
                continue;
            }

            let name = match entry.file_name().to_str() {
                Some(name) => name.to_owned(),
                None => {
                    let lossy = entry.file_name().to_string_lossy().into_owned();
                    log::warn!(
                        "File name is not valid UTF-8, reporting it as '{}': {}",
                        lossy,
                        entry.path().display()
                    );
                    lossy
                }
            };
            records.push(FileRecord::new(name, entry.into_path()));
        }

        // Path breaks ties between names that only differ before lossy decoding
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        log::debug!(
            "Listed {} files in {}",
            records.len(),
            self.root.display()
        );
        Ok(records)
    }
}

/// List the regular files of `dir`, sorted by name.
///
/// Convenience wrapper around [`Walker`].
///
/// # Errors
///
/// See [`Walker::list`].
pub fn list_directory(dir: &Path, follow_symlinks: bool) -> Result<Vec<FileRecord>, ScanError> {
    Walker::new(dir).with_follow_symlinks(follow_symlinks).list()
}
