//! Similarity finder implementation with two barrier-separated phases.
//!
//! # Overview
//!
//! This module orchestrates the near-duplicate detection pipeline:
//! 1. **Listing**: regular files of the target directory, sorted by name
//! 2. **Phase 1 - Fingerprinting**: fuzzy hash and size of every file, in
//!    parallel, reassembled in listing order
//! 3. **Phase 2 - Comparison**: one work unit per file index `i`, comparing
//!    `i` against every `j > i` in a read-only [`FingerprintTable`]
//! 4. **Report**: per-index match sets folded into a [`Report`]
//!
//! Phase 2 never starts before phase 1 has been fully assembled. Both phases
//! run on a dedicated rayon pool sized by [`worker_count`].
//!
//! # Example
//!
//! ```no_run
//! use neardupe::similarity::{SimilarityFinder, FinderConfig, ThresholdPolicy};
//! use std::path::Path;
//!
//! let policy = ThresholdPolicy::new(0.8, 0.5, 0.5).unwrap();
//! let finder = SimilarityFinder::new(FinderConfig::default().with_policy(policy));
//! let (report, summary) = finder.find_similar(Path::new(".")).unwrap();
//!
//! println!("{} files have similar files", summary.similar_bases);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;

use super::compare::{Comparator, HashMetric, MatchEntry, ThresholdPolicy};
use super::report::{self, Report};
use crate::progress::ProgressCallback;
use crate::scanner::walker::Walker;
use crate::scanner::{
    FileRecord, Fingerprint, Fingerprinter, FuzzyHasher, HashError, ScanError, SsdeepHasher,
};

/// File count above which the pool grows past the small fixed size.
pub const LARGE_INPUT_THRESHOLD: usize = 100;

/// Worker count used for small inputs.
pub const SMALL_INPUT_WORKERS: usize = 2;

/// Pick the number of workers for `file_count` files on a machine with
/// `hardware_threads` threads.
///
/// Small inputs get a fixed two workers so pool overhead does not dominate;
/// larger inputs get half of the hardware threads, but never fewer than the
/// small-input count. The result is at least 1 and never exceeds
/// `hardware_threads`, and it never decreases as `file_count` grows.
#[must_use]
pub fn worker_count(file_count: usize, hardware_threads: usize) -> usize {
    let hardware_threads = hardware_threads.max(1);
    let wanted = if file_count > LARGE_INPUT_THRESHOLD {
        (hardware_threads / 2).max(SMALL_INPUT_WORKERS)
    } else {
        SMALL_INPUT_WORKERS
    };
    wanted.clamp(1, hardware_threads)
}

fn hardware_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the similarity finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Minimum scores for a pair to be reported.
    pub policy: ThresholdPolicy,
    /// How fuzzy-hash digests are compared.
    pub hash_metric: HashMetric,
    /// Fixed worker count; `None` uses [`worker_count`].
    pub threads: Option<usize>,
    /// Abort the run on the first file that cannot be fingerprinted.
    pub strict: bool,
    /// Include symlinks that point at regular files.
    pub follow_symlinks: bool,
    /// Fuzzy-hashing scheme.
    pub hasher: Arc<dyn FuzzyHasher>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("policy", &self.policy)
            .field("hash_metric", &self.hash_metric)
            .field("threads", &self.threads)
            .field("strict", &self.strict)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("hasher", &"<hasher>")
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::default(),
            hash_metric: HashMetric::default(),
            threads: None,
            strict: false,
            follow_symlinks: false,
            hasher: Arc::new(SsdeepHasher::new()),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the threshold policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ThresholdPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the digest comparison strategy.
    #[must_use]
    pub fn with_hash_metric(mut self, metric: HashMetric) -> Self {
        self.hash_metric = metric;
        self
    }

    /// Use a fixed number of workers instead of the size-based policy.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// Set fail-fast on the first per-file error.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Include symlinks that point at regular files.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the fuzzy-hashing scheme.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn FuzzyHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Workers to use for `file_count` files.
    #[must_use]
    pub fn workers_for(&self, file_count: usize) -> usize {
        self.threads
            .unwrap_or_else(|| worker_count(file_count, hardware_threads()))
    }
}

// ============================================================================
// Errors and statistics
// ============================================================================

/// Errors that can occur during a similarity scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The directory could not be listed.
    #[error(transparent)]
    Scan(ScanError),

    /// A file could not be fingerprinted (strict mode only).
    #[error("Fingerprinting failed: {0}")]
    Fingerprint(#[from] HashError),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<ScanError> for FinderError {
    fn from(error: ScanError) -> Self {
        match error {
            ScanError::NotFound(path) => Self::PathNotFound(path),
            ScanError::NotADirectory(path) => Self::NotADirectory(path),
            other => Self::Scan(other),
        }
    }
}

/// Statistics from the fingerprinting phase.
#[derive(Debug, Clone, Default)]
pub struct FingerprintStats {
    /// Files that entered phase 1
    pub input_files: usize,
    /// Files fingerprinted successfully
    pub fingerprinted_files: usize,
    /// Per-file failures, in listing order
    pub errors: Vec<HashError>,
}

/// Summary statistics from a similarity scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Files found by the listing
    pub total_files: usize,
    /// Files that took part in the comparison phase
    pub fingerprinted_files: usize,
    /// Number of pairs evaluated
    pub comparisons: u64,
    /// Files with at least one match
    pub similar_bases: usize,
    /// Total number of matched pairs
    pub total_matches: usize,
    /// Worker count used for both phases
    pub workers: usize,
    /// Threshold policy of the run
    pub policy: ThresholdPolicy,
    /// Digest comparison strategy of the run
    pub hash_metric: HashMetric,
    /// Duration of the fingerprinting phase
    pub fingerprint_duration: Duration,
    /// Duration of the comparison phase
    pub compare_duration: Duration,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Files skipped because they could not be fingerprinted
    pub errors: Vec<HashError>,
}

impl ScanSummary {
    /// Empty summary for a run with the given settings.
    #[must_use]
    pub fn new(policy: ThresholdPolicy, hash_metric: HashMetric) -> Self {
        Self {
            total_files: 0,
            fingerprinted_files: 0,
            comparisons: 0,
            similar_bases: 0,
            total_matches: 0,
            workers: 0,
            policy,
            hash_metric,
            fingerprint_duration: Duration::ZERO,
            compare_duration: Duration::ZERO,
            scan_duration: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// Whether any file was skipped.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of skipped files.
    #[must_use]
    pub fn skipped_files(&self) -> usize {
        self.errors.len()
    }
}

/// Number of unordered pairs among `n` files.
#[must_use]
pub fn pair_count(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

// ============================================================================
// Phases
// ============================================================================

/// Fingerprints of the files that survived phase 1, in canonical order.
///
/// Built once after phase 1 and only ever shared by reference during
/// phase 2; it exposes no way to modify its contents.
#[derive(Debug, Clone, Default)]
pub struct FingerprintTable {
    records: Vec<FileRecord>,
    fingerprints: Vec<Fingerprint>,
}

impl FingerprintTable {
    /// Build a table from matching records and fingerprints.
    #[must_use]
    pub fn new(entries: Vec<(FileRecord, Fingerprint)>) -> Self {
        let (records, fingerprints) = entries.into_iter().unzip();
        Self {
            records,
            fingerprints,
        }
    }

    /// Number of files in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in canonical order.
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Fingerprints, index-aligned with [`Self::records`].
    #[must_use]
    pub fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }
}

/// Build the worker pool used for both phases.
///
/// # Errors
///
/// Returns `FinderError::ThreadPool` if rayon cannot spawn the workers.
pub fn build_pool(workers: usize) -> Result<ThreadPool, FinderError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|idx| format!("neardupe-worker-{idx}"))
        .build()?;
    Ok(pool)
}

/// Fingerprint every record in parallel (Phase 1).
///
/// Results are collected by listing index, not completion order. Files that
/// fail are left out of the returned table and recorded in the stats, unless
/// `config.strict` is set: then the first failure stops workers from picking
/// up further files, and the earliest failure (in listing order) among the
/// files already processed aborts the phase.
///
/// # Errors
///
/// - `FinderError::Interrupted` if the shutdown flag is raised
/// - `FinderError::Fingerprint` on a per-file failure in strict mode
pub fn phase1_fingerprint(
    records: Vec<FileRecord>,
    fingerprinter: &Fingerprinter,
    pool: &ThreadPool,
    config: &FinderConfig,
) -> Result<(FingerprintTable, FingerprintStats), FinderError> {
    let mut stats = FingerprintStats {
        input_files: records.len(),
        ..Default::default()
    };

    if records.is_empty() {
        log::debug!("Phase 1: No files to fingerprint");
        return Ok((FingerprintTable::default(), stats));
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("fingerprint", records.len());
    }

    log::info!("Phase 1: Fingerprinting {} files", records.len());

    let completed = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    // Inner `None`: not attempted because strict mode already failed
    let results: Option<Vec<Option<Result<Fingerprint, HashError>>>> = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                if config.is_shutdown_requested() {
                    return None;
                }
                if config.strict && failed.load(Ordering::Relaxed) {
                    return Some(None);
                }

                let result = fingerprinter.extract(&record.path);
                if let Err(ref e) = result {
                    log::warn!("Failed to fingerprint {}: {}", record.path.display(), e);
                    failed.store(true, Ordering::Relaxed);
                }

                if let Some(ref callback) = config.progress_callback {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    callback.on_progress(done, &record.name);
                }
                Some(Some(result))
            })
            .collect()
    });

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("fingerprint");
    }

    let results = match results {
        Some(results) if !config.is_shutdown_requested() => results,
        _ => {
            log::info!("Phase 1: Interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }
    };

    let mut entries = Vec::with_capacity(records.len());
    for (record, result) in records.into_iter().zip(results) {
        match result {
            Some(Ok(fingerprint)) => entries.push((record, fingerprint)),
            Some(Err(e)) if config.strict => return Err(FinderError::Fingerprint(e)),
            Some(Err(e)) => stats.errors.push(e),
            None => {}
        }
    }
    stats.fingerprinted_files = entries.len();

    log::info!(
        "Phase 1 complete: {} fingerprinted, {} skipped",
        stats.fingerprinted_files,
        stats.errors.len()
    );

    Ok((FingerprintTable::new(entries), stats))
}

/// Set aside records whose name is already taken by an earlier record.
///
/// The report is keyed by name, so two records sharing one (distinct non-UTF-8
/// names display identically) would overwrite each other. The first
/// occurrence is kept; every later one becomes a `HashError::DuplicateName`.
#[must_use]
pub fn split_duplicate_names(records: Vec<FileRecord>) -> (Vec<FileRecord>, Vec<HashError>) {
    let mut seen = HashSet::with_capacity(records.len());
    let mut kept = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();

    for record in records {
        if seen.contains(&record.name) {
            log::warn!(
                "Skipping {}: name '{}' is already used by another file",
                record.path.display(),
                record.name
            );
            duplicates.push(HashError::DuplicateName {
                path: record.path,
                name: record.name,
            });
        } else {
            seen.insert(record.name.clone());
            kept.push(record);
        }
    }

    (kept, duplicates)
}

/// Compare one base index against every later index.
///
/// This is the body of a single phase 2 work unit.
#[must_use]
pub fn compare_row(table: &FingerprintTable, comparator: &Comparator, i: usize) -> Vec<MatchEntry> {
    let records = table.records();
    let fingerprints = table.fingerprints();
    let base_name = &records[i].name;
    let base = &fingerprints[i];

    records
        .iter()
        .zip(fingerprints)
        .skip(i + 1)
        .filter_map(|(record, fingerprint)| {
            comparator.compare(base_name, base, &record.name, fingerprint)
        })
        .collect()
}

/// Compare every pair `(i, j)` with `i < j` in parallel (Phase 2).
///
/// There is one work unit per base index; each returns its own match list,
/// and the lists are collected by index.
///
/// # Errors
///
/// Returns `FinderError::Interrupted` if the shutdown flag is raised.
pub fn phase2_compare(
    table: &FingerprintTable,
    comparator: &Comparator,
    pool: &ThreadPool,
    config: &FinderConfig,
) -> Result<Vec<Vec<MatchEntry>>, FinderError> {
    let n = table.len();
    if n == 0 {
        log::debug!("Phase 2: No files to compare");
        return Ok(Vec::new());
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("compare", n);
    }

    log::info!(
        "Phase 2: Comparing {} files ({} pairs)",
        n,
        pair_count(n)
    );

    let completed = AtomicUsize::new(0);
    let results: Option<Vec<Vec<MatchEntry>>> = pool.install(|| {
        (0..n)
            .into_par_iter()
            .map(|i| {
                if config.is_shutdown_requested() {
                    return None;
                }

                let matches = compare_row(table, comparator, i);

                if let Some(ref callback) = config.progress_callback {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    callback.on_progress(done, &table.records()[i].name);
                }
                Some(matches)
            })
            .collect()
    });

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("compare");
    }

    match results {
        Some(results) if !config.is_shutdown_requested() => Ok(results),
        _ => {
            log::info!("Phase 2: Interrupted by shutdown signal");
            Err(FinderError::Interrupted)
        }
    }
}

// ============================================================================
// SimilarityFinder - Pipeline Orchestrator
// ============================================================================

/// Similarity finder that orchestrates listing, both phases and the report.
///
/// # Example
///
/// ```no_run
/// use neardupe::similarity::{SimilarityFinder, FinderConfig};
/// use std::path::Path;
///
/// let finder = SimilarityFinder::new(FinderConfig::default().with_threads(4));
/// match finder.find_similar(Path::new(".")) {
///     Ok((report, summary)) => {
///         println!("{} matches among {} files", report.match_count(), summary.total_files);
///     }
///     Err(e) => eprintln!("Scan failed: {}", e),
/// }
/// ```
pub struct SimilarityFinder {
    config: FinderConfig,
    fingerprinter: Fingerprinter,
    comparator: Comparator,
}

impl SimilarityFinder {
    /// Create a new finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let fingerprinter = Fingerprinter::new(Arc::clone(&config.hasher));
        let comparator = Comparator::new(config.policy)
            .with_metric(config.hash_metric)
            .with_hasher(Arc::clone(&config.hasher));
        Self {
            config,
            fingerprinter,
            comparator,
        }
    }

    /// Create a new finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// List `path` and find similar files among its regular files.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory
    /// - The directory cannot be read
    /// - The scan is interrupted by shutdown signal
    /// - A file cannot be fingerprinted and strict mode is on
    pub fn find_similar(&self, path: &Path) -> Result<(Report, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Retrieving all files from directory '{}'", path.display());
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("listing", 0);
        }

        let mut walker = Walker::new(path).with_follow_symlinks(self.config.follow_symlinks);
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        let listed = walker.list();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("listing");
        }
        let records = listed?;

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        log::info!("Number of files found: {}", records.len());

        let (report, mut summary) = self.find_similar_in(records)?;
        summary.scan_duration = start_time.elapsed();
        Ok((report, summary))
    }

    /// Find similar files among already listed records.
    ///
    /// `records` must be in canonical (name-sorted) order; the report
    /// follows that order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::find_similar`], minus the listing errors.
    pub fn find_similar_in(
        &self,
        records: Vec<FileRecord>,
    ) -> Result<(Report, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::new(self.config.policy, self.config.hash_metric);
        summary.total_files = records.len();
        summary.workers = self.config.workers_for(records.len());

        log::debug!(
            "Using {} workers for {} files",
            summary.workers,
            records.len()
        );
        let pool = build_pool(summary.workers)?;

        let (records, duplicates) = split_duplicate_names(records);
        if self.config.strict {
            if let Some(first) = duplicates.into_iter().next() {
                return Err(FinderError::Fingerprint(first));
            }
        } else {
            summary.errors = duplicates;
        }

        let phase_start = Instant::now();
        let (table, stats) = phase1_fingerprint(records, &self.fingerprinter, &pool, &self.config)?;
        summary.fingerprint_duration = phase_start.elapsed();
        summary.fingerprinted_files = stats.fingerprinted_files;
        summary.errors.extend(stats.errors);

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let phase_start = Instant::now();
        let matches = phase2_compare(&table, &self.comparator, &pool, &self.config)?;
        summary.compare_duration = phase_start.elapsed();
        summary.comparisons = pair_count(table.len());

        let report = report::build(table.records(), table.fingerprints(), matches);
        summary.similar_bases = report.base_count();
        summary.total_matches = report.match_count();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} files with similar files, {} matches, {} skipped in {:.2?}",
            summary.similar_bases,
            summary.total_matches,
            summary.skipped_files(),
            summary.scan_duration
        );

        Ok((report, summary))
    }
}
