// src/output/human.rs
//! Human-readable colored terminal output

use crate::output::{OutputHandler, SharedWriter};
use crate::types::{EntryKind, MatchResult};
use colored::Colorize;
use std::io::{self, Write};

/// Human-readable output handler with colored terminal output
pub struct HumanOutput {
    writer: SharedWriter,
    use_colors: bool,
}

impl HumanOutput {
    /// Create a new HumanOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: SharedWriter::stdout(),
            use_colors: is_terminal::is_terminal(io::stdout()),
        }
    }

    /// Create a new HumanOutput that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self::to_writer(Box::new(file), false)
    }

    pub fn to_writer(writer: Box<dyn Write + Send>, use_colors: bool) -> Self {
        Self {
            writer: SharedWriter::new(writer),
            use_colors,
        }
    }

    /// Format a Unix timestamp as `YYYY-MM-DD HH:MM:SS`
    fn format_timestamp(ts: i64) -> String {
        use chrono::DateTime;

        match DateTime::from_timestamp(ts, 0) {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("{}", ts),
        }
    }

    fn render(&self, result: &MatchResult, w: &mut dyn Write) -> io::Result<()> {
        let timestamp = Self::format_timestamp(result.timestamp as i64);
        let (marker, name) = match result.kind {
            EntryKind::Certificate => ("[+]", result.display_name().unwrap_or("<no name>")),
            EntryKind::Precertificate => ("[P]", "precertificate"),
        };
        let index = format!("#{}", result.index);

        if self.use_colors {
            writeln!(
                w,
                "{} {} {} {}",
                format!("[{}]", timestamp).dimmed(),
                marker.green().bold(),
                index.yellow(),
                name.cyan().bold()
            )?;
        } else {
            writeln!(w, "[{}] {} {} {}", timestamp, marker, index, name)?;
        }

        let label = |text: &str| -> String {
            if self.use_colors {
                text.dimmed().to_string()
            } else {
                text.to_string()
            }
        };

        if !result.alt_names.is_empty() {
            writeln!(w, "    {} {}", label("Alt names:"), result.alt_names.join(", "))?;
        }

        if let Some(ref issuer) = result.issuer {
            writeln!(w, "    {} {}", label("Issuer:"), issuer)?;
        }

        if let (Some(not_before), Some(not_after)) = (result.not_before, result.not_after) {
            writeln!(
                w,
                "    {} {} to {}",
                label("Valid:"),
                Self::format_timestamp(not_before),
                Self::format_timestamp(not_after)
            )?;
        }

        Ok(())
    }
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputHandler for HumanOutput {
    fn emit_match(&self, result: &MatchResult) -> anyhow::Result<()> {
        self.writer.with(|w| self.render(result, w))
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.writer.with(|_| Ok(()))
    }
}
