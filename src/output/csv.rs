//! CSV output formatter for scan results.
//!
//! One row is generated for each matched pair, in report order.
//!
//! # Columns
//!
//! - `base`, `base_hash`, `base_size`: the file the pair was found from
//! - `matched`, `matched_hash`, `matched_size`: the similar file
//! - `name_distance`, `hash_distance`, `size_distance`: rounded scores

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::similarity::Report;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The buffered output was not valid UTF-8.
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    base: &'a str,
    base_hash: &'a str,
    base_size: u64,
    matched: &'a str,
    matched_hash: &'a str,
    matched_size: u64,
    name_distance: f64,
    hash_distance: f64,
    size_distance: f64,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a Report,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when the report is empty.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record([
            "base",
            "base_hash",
            "base_size",
            "matched",
            "matched_hash",
            "matched_size",
            "name_distance",
            "hash_distance",
            "size_distance",
        ])?;

        for (base, entry) in self.report.iter() {
            for (matched, found) in &entry.similar_files {
                csv_writer.serialize(CsvRow {
                    base,
                    base_hash: &entry.hash,
                    base_size: entry.size,
                    matched,
                    matched_hash: &found.matched_hash,
                    matched_size: found.matched_size,
                    name_distance: found.name_distance,
                    hash_distance: found.hash_distance,
                    size_distance: found.size_distance,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
