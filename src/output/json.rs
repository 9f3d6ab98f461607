//! JSON output formatter for scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "similar_files": {
//!     "a.txt": {
//!       "hash": "3:abc:def",
//!       "size": 100,
//!       "similar_files": {
//!         "a_copy.txt": {
//!           "hash": "3:abc:def",
//!           "size": 100,
//!           "name_distance": 0.583,
//!           "hash_distance": 1.0,
//!           "size_distance": 1.0
//!         }
//!       }
//!     }
//!   },
//!   "skipped": [
//!     { "path": "/dir/locked.bin", "kind": "io", "message": "Permission denied: /dir/locked.bin" }
//!   ],
//!   "summary": { "total_files": 3, "similar_bases": 1, "total_matches": 1, ... },
//!   "generated_at": "2026-01-01T00:00:00Z"
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExitCode;
use crate::scanner::{ErrorKind, HashError};
use crate::similarity::{HashMetric, Report, ScanSummary, ThresholdPolicy};

/// A file that was left out of the comparison.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSkipped {
    /// Path of the file
    pub path: String,
    /// Failing stage
    pub kind: ErrorKind,
    /// Human-readable reason
    pub message: String,
}

impl From<&HashError> for JsonSkipped {
    fn from(error: &HashError) -> Self {
        Self {
            path: error.path().to_string_lossy().into_owned(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files found by the listing
    pub total_files: usize,
    /// Files that took part in the comparison
    pub fingerprinted_files: usize,
    /// Files skipped because of per-file errors
    pub skipped_files: usize,
    /// Number of pairs evaluated
    pub comparisons: u64,
    /// Files with at least one match
    pub similar_bases: usize,
    /// Total matched pairs
    pub total_matches: usize,
    /// Worker count of both phases
    pub workers: usize,
    /// Thresholds of the run
    pub thresholds: ThresholdPolicy,
    /// Digest comparison strategy
    pub hash_metric: HashMetric,
    /// Duration of the fingerprinting phase in milliseconds
    pub fingerprint_duration_ms: u64,
    /// Duration of the comparison phase in milliseconds
    pub compare_duration_ms: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "ND000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            fingerprinted_files: summary.fingerprinted_files,
            skipped_files: summary.skipped_files(),
            comparisons: summary.comparisons,
            similar_bases: summary.similar_bases,
            total_matches: summary.total_matches,
            workers: summary.workers,
            thresholds: summary.policy,
            hash_metric: summary.hash_metric,
            fingerprint_duration_ms: summary.fingerprint_duration.as_millis() as u64,
            compare_duration_ms: summary.compare_duration.as_millis() as u64,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Base file name → matches
    pub similar_files: &'a Report,
    /// Files left out of the comparison
    pub skipped: Vec<JsonSkipped>,
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
}

impl<'a> JsonOutput<'a> {
    /// Create a new JSON output from a report, summary and exit code.
    #[must_use]
    pub fn new(report: &'a Report, summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            similar_files: report,
            skipped: summary.errors.iter().map(JsonSkipped::from).collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
            generated_at: Utc::now(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
