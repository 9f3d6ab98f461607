//! neardupe - near-duplicate file finder
//!
//! Compares every pair of regular files in a directory by name similarity,
//! fuzzy-hash similarity and relative size, and reports the pairs that meet
//! all configured thresholds. Fingerprinting and comparison run as two
//! parallel phases on a rayon pool.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod similarity;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::similarity::SimilarityFinder;

/// Run the application and print the report to stdout.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the directory cannot be
/// scanned, the scan is interrupted, or the report cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let color = !cli.no_color && io::stdout().is_terminal();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_app_to(cli, &mut out, color)
}

/// Run the application, writing the report to `out`.
///
/// # Errors
///
/// Same as [`run_app`].
pub fn run_app_to<W: Write>(cli: Cli, out: &mut W, color: bool) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(ref args) => handle_scan(args, cli.quiet, color, out),
    }
}

fn handle_scan<W: Write>(args: &ScanArgs, quiet: bool, color: bool, out: &mut W) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref())
        .and_then(|config| config.merge_cli(args))
        .context("Invalid configuration")?;
    log::debug!("Effective configuration: {config:?}");

    let handler = signal::install_handler()?;
    let mut finder_config = config
        .finder_config()
        .context("Invalid configuration")?
        .with_shutdown_flag(handler.get_flag());

    if !quiet && !args.output.is_machine_readable() && io::stderr().is_terminal() {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    log::info!("Running detector to identify similar files");
    let finder = SimilarityFinder::new(finder_config);
    let (report, summary) = finder.find_similar(&args.path)?;

    if report.is_empty() {
        log::info!("No similar files found");
    } else {
        log::info!("Number of similar files found: {}", summary.total_matches);
    }
    if summary.is_partial() {
        log::warn!(
            "{} file(s) could not be fingerprinted and were skipped",
            summary.skipped_files()
        );
    }

    let exit_code = ExitCode::for_outcome(!report.is_empty(), summary.is_partial());

    match args.output {
        OutputFormat::Text => TextOutput::new(&report, &summary)
            .with_color(color)
            .write_to(out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&report, &summary, exit_code)
            .write_to(out, true)
            .context("Failed to write JSON report")?,
        OutputFormat::Csv => CsvOutput::new(&report)
            .write_to(&mut *out)
            .context("Failed to write CSV report")?,
    }
    out.flush()?;

    Ok(exit_code)
}
