// src/cli.rs
use clap::Parser;

use crate::config::{Config, MatcherConfig};

/// ct-audit: Certificate Transparency Log Auditor
///
/// Scan every entry of a CT log, from a start index up to the current tree
/// size, and report the certificates matching a predicate.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-audit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// Path to TOML config file (optional)
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Base URL of the CT log to scan
    #[arg(long = "log-url")]
    pub log_url: Option<String>,

    // ===== Scan =====
    /// Log index to start scanning at
    #[arg(long = "start-index")]
    pub start_index: Option<u64>,

    /// Entries requested per get-entries call
    #[arg(long = "batch-size")]
    pub batch_size: Option<u64>,

    /// Number of concurrent fetch workers
    #[arg(long = "fetch-workers")]
    pub fetch_workers: Option<usize>,

    /// Number of concurrent classify workers
    #[arg(long = "classify-workers")]
    pub classify_workers: Option<usize>,

    // ===== Filtering & Matching =====
    /// Report only certificates whose CN or a SAN matches this regex
    #[arg(long = "match-subject-regex")]
    pub match_subject_regex: Option<String>,

    /// Report no certificates (count entries and precertificates only)
    #[arg(long = "match-none")]
    pub match_none: bool,

    /// Also report precertificate entries
    #[arg(long = "show-precerts")]
    pub show_precerts: bool,

    // ===== Output =====
    /// Output matches in JSONL format
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Write output to file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Disable progress indicator
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if self.match_none && self.match_subject_regex.is_some() {
            anyhow::bail!("Cannot specify both --match-none and --match-subject-regex");
        }

        if self.batch_size == Some(0) {
            anyhow::bail!("--batch-size must be greater than 0");
        }

        if self.fetch_workers == Some(0) || self.classify_workers == Some(0) {
            anyhow::bail!("Worker counts must be greater than 0");
        }

        Ok(())
    }

    /// Determine the output format based on flags
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    /// Check if progress indicator should be enabled
    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }

    /// Log level forced by flags, if any
    pub fn log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }

    /// Overlay flags given on the command line onto the file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref url) = self.log_url {
            config.log.url = Some(url.clone());
        }
        if let Some(start_index) = self.start_index {
            config.scan.start_index = start_index;
        }
        if let Some(batch_size) = self.batch_size {
            config.scan.batch_size = batch_size;
        }
        if let Some(workers) = self.fetch_workers {
            config.scan.fetch_parallelism = workers;
        }
        if let Some(workers) = self.classify_workers {
            config.scan.classify_parallelism = workers;
        }
        if let Some(ref pattern) = self.match_subject_regex {
            config.matcher = MatcherConfig::SubjectRegex {
                pattern: pattern.clone(),
            };
        } else if self.match_none {
            config.matcher = MatcherConfig::Nothing;
        }
        if let Some(level) = self.log_level() {
            config.logging.level = level.to_string();
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored text output (default)
    Human,
    /// JSON Lines format (one JSON object per line)
    Json,
}
