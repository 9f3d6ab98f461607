//! Layered configuration.
//!
//! Settings are merged from, lowest to highest priority:
//!
//! 1. Built-in defaults (all thresholds `0.0`, string hash metric)
//! 2. A TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory when present
//! 3. Environment variables prefixed with `NEARDUPE_`
//!    (e.g. `NEARDUPE_NAME_THRESHOLD=0.8`)
//! 4. Command-line flags
//!
//! Thresholds are validated once all layers are merged, before any file is
//! touched.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::ScanArgs;
use crate::similarity::{FinderConfig, HashMetric, ThresholdPolicy};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "NEARDUPE_";

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A threshold is outside `[0.0, 1.0]` or not a number.
    #[error("{option} must be within [0.0, 1.0], got {value}")]
    ThresholdOutOfRange {
        /// Name of the offending option
        option: &'static str,
        /// Rejected value
        value: f64,
    },

    /// A worker count of zero was requested.
    #[error("threads must be at least 1")]
    InvalidThreads,

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A layer could not be parsed or merged.
    #[error("Failed to load configuration: {0}")]
    Load(#[source] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Load(Box::new(error))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum name similarity
    pub name_threshold: f64,
    /// Minimum fuzzy-hash similarity
    pub hash_threshold: f64,
    /// Minimum size similarity
    pub size_threshold: f64,
    /// How fuzzy-hash digests are compared
    pub hash_metric: HashMetric,
    /// Fixed worker count instead of the size-based policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Abort on the first file that cannot be fingerprinted
    pub strict: bool,
    /// Include symlinks that point at regular files
    pub follow_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name_threshold: 0.0,
            hash_threshold: 0.0,
            size_threshold: 0.0,
            hash_metric: HashMetric::StringSimilarity,
            threads: None,
            strict: false,
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment.
    ///
    /// When `explicit_path` is given it must exist; otherwise the default
    /// platform path is used if a file is there.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing (explicit path only),
    /// cannot be parsed, or the merged values are invalid.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded layers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the result is invalid.
    pub fn merge_cli(mut self, args: &ScanArgs) -> Result<Self, ConfigError> {
        if let Some(value) = args.name_threshold {
            self.name_threshold = value;
        }
        if let Some(value) = args.hash_threshold {
            self.hash_threshold = value;
        }
        if let Some(value) = args.size_threshold {
            self.size_threshold = value;
        }
        if let Some(metric) = args.hash_metric {
            self.hash_metric = metric;
        }
        if let Some(threads) = args.threads {
            self.threads = Some(threads);
        }
        self.strict |= args.strict;
        self.follow_symlinks |= args.follow_symlinks;

        self.validate()?;
        Ok(self)
    }

    /// Check every value.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy()?;
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidThreads);
        }
        Ok(())
    }

    /// Threshold policy described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ThresholdOutOfRange` for an invalid threshold.
    pub fn policy(&self) -> Result<ThresholdPolicy, ConfigError> {
        ThresholdPolicy::new(self.name_threshold, self.hash_threshold, self.size_threshold)
    }

    /// Finder configuration described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn finder_config(&self) -> Result<FinderConfig, ConfigError> {
        self.validate()?;
        let mut config = FinderConfig::default()
            .with_policy(self.policy()?)
            .with_hash_metric(self.hash_metric)
            .with_strict(self.strict)
            .with_follow_symlinks(self.follow_symlinks);
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        Ok(config)
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "neardupe", "neardupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
