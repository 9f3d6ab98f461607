//! Near-duplicate detection module.
//!
//! This module provides functionality for:
//! - Pairwise scoring of files by name, fuzzy hash and size ([`compare`])
//! - Parallel fingerprinting and all-pairs comparison ([`finder`])
//! - Folding matches into a per-file report ([`report`])

pub mod compare;
pub mod finder;
pub mod report;

pub use compare::{
    round3, size_distance, string_similarity, Comparator, HashMetric, MatchEntry, PairScore,
    ThresholdPolicy,
};
pub use finder::{
    worker_count, FinderConfig, FinderError, FingerprintTable, ScanSummary, SimilarityFinder,
};
pub use report::{Report, ReportEntry};
