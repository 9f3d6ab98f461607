//! Human-readable report.
//!
//! ```text
//! ********************************************************************************
//! report.txt (hash: 3:abc:def, size: 1.2 KiB)
//!   report_copy.txt (hash: 3:abc:deg, size: 1.2 KiB) name 0.933 | hash 0.962 | size 1.000
//! ********************************************************************************
//! 1 file with similar files, 1 match
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Paint, Style};

use crate::similarity::{Report, ScanSummary};

const RULER_WIDTH: usize = 80;

/// Plain-text report writer.
pub struct TextOutput<'a> {
    report: &'a Report,
    summary: &'a ScanSummary,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a writer for a finished scan.
    #[must_use]
    pub fn new(report: &'a Report, summary: &'a ScanSummary) -> Self {
        Self {
            report,
            summary,
            color: false,
        }
    }

    /// Enable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn styled(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.report.is_empty() {
            writeln!(writer, "No similar files found.")?;
        } else {
            let ruler = "*".repeat(RULER_WIDTH);
            writeln!(writer, "{ruler}")?;
            for (base, entry) in self.report.iter() {
                writeln!(
                    writer,
                    "{} (hash: {}, size: {})",
                    self.styled(base, Style::new().bold()),
                    entry.hash,
                    ByteSize::b(entry.size)
                )?;
                for (matched, found) in &entry.similar_files {
                    writeln!(
                        writer,
                        "  {} (hash: {}, size: {}) name {:.3} | hash {:.3} | size {:.3}",
                        self.styled(matched, Style::new().green()),
                        found.matched_hash,
                        ByteSize::b(found.matched_size),
                        found.name_distance,
                        found.hash_distance,
                        found.size_distance
                    )?;
                }
            }
            writeln!(writer, "{ruler}")?;
            writeln!(
                writer,
                "{} with similar files, {}",
                plural(self.summary.similar_bases, "file"),
                plural(self.summary.total_matches, "match")
            )?;
        }

        if self.summary.is_partial() {
            let header = format!("Skipped {}:", plural(self.summary.skipped_files(), "file"));
            writeln!(writer, "{}", self.styled(&header, Style::new().yellow()))?;
            for error in &self.summary.errors {
                writeln!(writer, "  {error}")?;
            }
        }
        Ok(())
    }

    /// Render the report into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting fails.
    pub fn render(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn plural(count: usize, noun: &str) -> String {
    match (count, noun) {
        (1, _) => format!("1 {noun}"),
        (_, "match") => format!("{count} matches"),
        _ => format!("{count} {noun}s"),
    }
}
