//! Command-line interface definitions.
//!
//! Global options (verbosity, color, error format) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Report every pair in a directory
//! neardupe scan ~/Documents
//!
//! # Only pairs with close names and near-identical content
//! neardupe scan ~/Documents -n 0.9 -f 0.8
//!
//! # JSON output with the fuzzy-hash score metric
//! neardupe scan ~/Documents --hash-metric fuzzy --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::similarity::HashMetric;

/// Near-duplicate file finder.
///
/// Compares every pair of files in a directory by name similarity, fuzzy-hash
/// similarity and size, and reports the pairs that meet all thresholds.
#[derive(Debug, Parser)]
#[command(name = "neardupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for similar files
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory whose regular files are compared (not recursive)
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    /// Minimum name similarity, 0.0 to 1.0
    #[arg(short = 'n', long, value_name = "F", value_parser = parse_threshold)]
    pub name_threshold: Option<f64>,

    /// Minimum fuzzy-hash similarity, 0.0 to 1.0
    #[arg(short = 'f', long, value_name = "F", value_parser = parse_threshold)]
    pub hash_threshold: Option<f64>,

    /// Minimum size similarity, 0.0 to 1.0
    #[arg(short = 's', long, value_name = "F", value_parser = parse_threshold)]
    pub size_threshold: Option<f64>,

    /// How fuzzy-hash digests are compared
    #[arg(long, value_enum, value_name = "METRIC")]
    pub hash_metric: Option<HashMetric>,

    /// Number of worker threads (default: 2 for up to 100 files, else half the CPUs)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(usize))]
    pub threads: Option<usize>,

    /// Abort on the first file that cannot be read or hashed
    #[arg(long)]
    pub strict: bool,

    /// Include symbolic links that point at regular files
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Configuration file to load instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output, one row per matched pair
    Csv,
}

impl OutputFormat {
    /// Whether the format is meant for other programs.
    #[must_use]
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a similarity threshold in `[0.0, 1.0]`.
///
/// # Examples
///
/// ```
/// use neardupe::cli::parse_threshold;
///
/// assert_eq!(parse_threshold("0.8").unwrap(), 0.8);
/// assert!(parse_threshold("1.5").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the string is not a number, or the number is not
/// finite or outside `[0.0, 1.0]`.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let value: f64 = s.parse().map_err(|_| format!("Invalid number: '{s}'"))?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("Threshold must be between 0.0 and 1.0, got {s}"));
    }
    Ok(value)
}
