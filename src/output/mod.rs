//! Output formatters for scan results.
//!
//! - Text for people, in the classic ruler-delimited layout
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use neardupe::error::ExitCode;
//! use neardupe::output::json::JsonOutput;
//! use neardupe::similarity::SimilarityFinder;
//! use std::path::Path;
//!
//! let finder = SimilarityFinder::with_defaults();
//! let (report, summary) = finder.find_similar(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&report, &summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
