//! Report assembly from per-file match sets.
//!
//! The report maps each base file that has at least one match to its own
//! fingerprint and the files it matched. Entries keep canonical file order,
//! both for bases and for their matches, so serializing the same run twice
//! produces identical output.

use indexmap::IndexMap;
use serde::Serialize;

use super::compare::MatchEntry;
use crate::scanner::{FileRecord, Fingerprint};

/// A base file and the files similar to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Fuzzy-hash digest of the base file
    pub hash: String,
    /// Size of the base file in bytes
    pub size: u64,
    /// Matched files keyed by name, in canonical order
    pub similar_files: IndexMap<String, MatchEntry>,
}

/// Base file name → [`ReportEntry`], in canonical order.
///
/// Serializes as a nested JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: IndexMap<String, ReportEntry>,
}

impl Report {
    /// Whether no file has any match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files with at least one match.
    #[must_use]
    pub fn base_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of matched pairs.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.entries.values().map(|e| e.similar_files.len()).sum()
    }

    /// Look up the entry for a base file.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReportEntry> {
        self.entries.get(name)
    }

    /// Iterate over `(base name, entry)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ReportEntry)> {
        self.entries.iter()
    }
}

/// Fold per-index match sets into a [`Report`].
///
/// `records`, `fingerprints` and `matches` share one index space. Indices
/// with an empty match set are left out.
#[must_use]
pub fn build(
    records: &[FileRecord],
    fingerprints: &[Fingerprint],
    matches: Vec<Vec<MatchEntry>>,
) -> Report {
    debug_assert_eq!(records.len(), fingerprints.len());
    debug_assert_eq!(records.len(), matches.len());

    let entries = records
        .iter()
        .zip(fingerprints)
        .zip(matches)
        .filter(|(_, found)| !found.is_empty())
        .map(|((record, fingerprint), found)| {
            let similar_files = found
                .into_iter()
                .map(|entry| (entry.matched_name.clone(), entry))
                .collect();
            (
                record.name.clone(),
                ReportEntry {
                    hash: fingerprint.hash.clone(),
                    size: fingerprint.size,
                    similar_files,
                },
            )
        })
        .collect();

    Report { entries }
}
