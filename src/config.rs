// src/config.rs

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::matcher::{MatchAll, MatchNone, MatchSubjectRegex, Matcher};
use crate::scanner::{RetryPolicy, ScanOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Base URL of the log, e.g. `https://ct.googleapis.com/logs/argon2024`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_parallelism")]
    pub fetch_parallelism: usize,
    #[serde(default = "default_parallelism")]
    pub classify_parallelism: usize,
    #[serde(default)]
    pub start_index: u64,
    #[serde(default = "default_fetch_queue_capacity")]
    pub fetch_queue_capacity: usize,
    #[serde(default = "default_classify_queue_capacity")]
    pub classify_queue_capacity: usize,
}

fn default_batch_size() -> u64 { 1000 }
fn default_parallelism() -> usize { 2 }
fn default_fetch_queue_capacity() -> usize { 100 }
fn default_classify_queue_capacity() -> usize { 5000 }

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            fetch_parallelism: default_parallelism(),
            classify_parallelism: default_parallelism(),
            start_index: 0,
            fetch_queue_capacity: default_fetch_queue_capacity(),
            classify_queue_capacity: default_classify_queue_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Consecutive failures before a batch is abandoned; absent retries forever
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_max_backoff_secs() -> u64 { 60 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_backoff_ms: 0,
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }
}

/// Which certificates get reported
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum MatcherConfig {
    #[default]
    #[serde(rename = "all")]
    Everything,
    #[serde(rename = "none")]
    Nothing,
    #[serde(rename = "subject_regex")]
    SubjectRegex { pattern: String },
}

impl MatcherConfig {
    pub fn build(&self) -> anyhow::Result<Arc<dyn Matcher>> {
        Ok(match self {
            MatcherConfig::Everything => Arc::new(MatchAll),
            MatcherConfig::Nothing => Arc::new(MatchNone),
            MatcherConfig::SubjectRegex { pattern } => Arc::new(
                MatchSubjectRegex::from_pattern(pattern)
                    .with_context(|| format!("Invalid subject regex '{}'", pattern))?,
            ),
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Scan options described by this configuration
    pub fn scan_options(&self) -> anyhow::Result<ScanOptions> {
        let options = ScanOptions {
            matcher: self.matcher.build()?,
            batch_size: self.scan.batch_size,
            fetch_parallelism: self.scan.fetch_parallelism,
            classify_parallelism: self.scan.classify_parallelism,
            start_index: self.scan.start_index,
            fetch_queue_capacity: self.scan.fetch_queue_capacity,
            classify_queue_capacity: self.scan.classify_queue_capacity,
            retry: self.retry.policy(),
            ..ScanOptions::default()
        };
        options.validate()?;
        Ok(options)
    }
}
