//! Pairwise comparison of two fingerprinted files.
//!
//! # Overview
//!
//! Three scores are computed for a pair, each in `[0, 1]` where `1.0` means
//! identical:
//!
//! 1. **Name distance**: Jaro-Winkler similarity of the file names
//! 2. **Hash distance**: similarity of the fuzzy-hash digests, either as
//!    plain strings (Jaro-Winkler) or with the hashing scheme's own score,
//!    selected by [`HashMetric`]
//! 3. **Size distance**: `1 - |a - b| / a`, relative to the base file `a`
//!
//! A pair is accepted when every score reaches its threshold in the
//! [`ThresholdPolicy`]. Evaluation stops at the first failing score.
//!
//! # Example
//!
//! ```
//! use neardupe::scanner::Fingerprint;
//! use neardupe::similarity::{Comparator, ThresholdPolicy};
//!
//! let comparator = Comparator::new(ThresholdPolicy::default());
//! let a = Fingerprint::new("3:abc:def", 100);
//! let b = Fingerprint::new("3:abc:def", 100);
//! let entry = comparator.compare("a.txt", &a, "a_copy.txt", &b).unwrap();
//! assert_eq!(entry.hash_distance, 1.0);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::scanner::{Fingerprint, FuzzyHasher, SsdeepHasher};

/// Minimum score per dimension for a pair to be reported.
///
/// All thresholds default to `0.0`, which accepts every pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ThresholdPolicy {
    name: f64,
    hash: f64,
    size: f64,
}

impl ThresholdPolicy {
    /// Create a policy, rejecting thresholds outside `[0.0, 1.0]`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ThresholdOutOfRange` naming the offending option.
    pub fn new(name: f64, hash: f64, size: f64) -> Result<Self, ConfigError> {
        check_threshold("name_threshold", name)?;
        check_threshold("hash_threshold", hash)?;
        check_threshold("size_threshold", size)?;
        Ok(Self { name, hash, size })
    }

    /// Threshold for the name distance.
    #[must_use]
    pub fn name(&self) -> f64 {
        self.name
    }

    /// Threshold for the fuzzy-hash distance.
    #[must_use]
    pub fn hash(&self) -> f64 {
        self.hash
    }

    /// Threshold for the size distance.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Whether a fully computed score passes every threshold.
    #[must_use]
    pub fn accepts(&self, score: &PairScore) -> bool {
        score.name_distance >= self.name
            && score.hash_distance >= self.hash
            && score.size_distance >= self.size
    }
}

fn check_threshold(option: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { option, value })
    }
}

/// How fuzzy-hash digests are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum HashMetric {
    /// Jaro-Winkler similarity of the digest strings
    #[default]
    #[value(name = "string")]
    #[serde(rename = "string")]
    StringSimilarity,
    /// The hashing scheme's own 0-100 score, scaled to `[0, 1]`
    #[value(name = "fuzzy")]
    #[serde(rename = "fuzzy")]
    FuzzyScore,
}

impl std::fmt::Display for HashMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashMetric::StringSimilarity => write!(f, "string"),
            HashMetric::FuzzyScore => write!(f, "fuzzy"),
        }
    }
}

/// Raw, unrounded scores of one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    /// Name similarity in `[0, 1]`
    pub name_distance: f64,
    /// Fuzzy-hash similarity in `[0, 1]`
    pub hash_distance: f64,
    /// Size similarity in `[0, 1]`
    pub size_distance: f64,
}

/// One accepted pair, as it appears in the report.
///
/// Distances are rounded to three decimal places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEntry {
    /// Name of the matched file
    #[serde(skip)]
    pub matched_name: String,
    /// Fuzzy-hash digest of the matched file
    #[serde(rename = "hash")]
    pub matched_hash: String,
    /// Size of the matched file in bytes
    #[serde(rename = "size")]
    pub matched_size: u64,
    /// Rounded name distance
    pub name_distance: f64,
    /// Rounded hash distance
    pub hash_distance: f64,
    /// Rounded size distance
    pub size_distance: f64,
}

impl MatchEntry {
    /// Build a report entry from a raw score, rounding at this boundary only.
    #[must_use]
    pub fn from_score(name: &str, fingerprint: &Fingerprint, score: &PairScore) -> Self {
        Self {
            matched_name: name.to_string(),
            matched_hash: fingerprint.hash.clone(),
            matched_size: fingerprint.size,
            name_distance: round3(score.name_distance),
            hash_distance: round3(score.hash_distance),
            size_distance: round3(score.size_distance),
        }
    }
}

/// Round to three decimal places.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Jaro-Winkler similarity of two strings.
#[must_use]
pub fn string_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(a, b)
}

/// Size similarity of `other` relative to `base`.
///
/// A zero-size base has no relative scale: it matches exactly when `other`
/// is also empty (`1.0`) and not at all otherwise (`0.0`). Results are
/// clamped to `[0, 1]`, so files more than twice the base size score `0.0`.
#[must_use]
pub fn size_distance(base: u64, other: u64) -> f64 {
    if base == 0 {
        return if other == 0 { 1.0 } else { 0.0 };
    }
    let diff = base.abs_diff(other) as f64;
    (1.0 - diff / base as f64).clamp(0.0, 1.0)
}

/// Scores pairs of fingerprints and applies a [`ThresholdPolicy`].
#[derive(Clone)]
pub struct Comparator {
    policy: ThresholdPolicy,
    metric: HashMetric,
    hasher: Arc<dyn FuzzyHasher>,
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("policy", &self.policy)
            .field("metric", &self.metric)
            .field("hasher", &"<hasher>")
            .finish()
    }
}

impl Comparator {
    /// Create a comparator using string similarity for digests.
    #[must_use]
    pub fn new(policy: ThresholdPolicy) -> Self {
        Self {
            policy,
            metric: HashMetric::default(),
            hasher: Arc::new(SsdeepHasher::new()),
        }
    }

    /// Select the digest comparison strategy.
    #[must_use]
    pub fn with_metric(mut self, metric: HashMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the hashing scheme used by [`HashMetric::FuzzyScore`].
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn FuzzyHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// The threshold policy in use.
    #[must_use]
    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// The digest comparison strategy in use.
    #[must_use]
    pub fn metric(&self) -> HashMetric {
        self.metric
    }

    fn hash_distance(&self, a: &str, b: &str) -> f64 {
        match self.metric {
            HashMetric::StringSimilarity => string_similarity(a, b),
            HashMetric::FuzzyScore => self.hasher.compare(a, b).unwrap_or(0.0),
        }
    }

    /// Compute all three scores without applying thresholds.
    #[must_use]
    pub fn score(
        &self,
        name_a: &str,
        fp_a: &Fingerprint,
        name_b: &str,
        fp_b: &Fingerprint,
    ) -> PairScore {
        PairScore {
            name_distance: string_similarity(name_a, name_b),
            hash_distance: self.hash_distance(&fp_a.hash, &fp_b.hash),
            size_distance: size_distance(fp_a.size, fp_b.size),
        }
    }

    /// Compare file `a` (the base) with file `b`.
    ///
    /// Returns the report entry for `b` when all thresholds pass. Scores are
    /// evaluated in the order name, hash, size and evaluation stops at the
    /// first one below its threshold.
    #[must_use]
    pub fn compare(
        &self,
        name_a: &str,
        fp_a: &Fingerprint,
        name_b: &str,
        fp_b: &Fingerprint,
    ) -> Option<MatchEntry> {
        let name_distance = string_similarity(name_a, name_b);
        if name_distance < self.policy.name {
            return None;
        }

        let hash_distance = self.hash_distance(&fp_a.hash, &fp_b.hash);
        if hash_distance < self.policy.hash {
            return None;
        }

        let size_distance = size_distance(fp_a.size, fp_b.size);
        if size_distance < self.policy.size {
            return None;
        }

        let score = PairScore {
            name_distance,
            hash_distance,
            size_distance,
        };
        Some(MatchEntry::from_score(name_b, fp_b, &score))
    }
}
