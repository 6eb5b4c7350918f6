// src/stats.rs
//! Counters shared by the scan pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe counters for one scan.
///
/// Written by classify and fetch workers, read by the progress reporter.
#[derive(Debug, Default)]
pub struct ScanCounters {
    entries_processed: AtomicU64,
    precerts_seen: AtomicU64,
    certs_matched: AtomicU64,
    decode_failures: AtomicU64,
    batches_abandoned: AtomicU64,
}

impl ScanCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_processed(&self) {
        self.entries_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_precerts(&self) {
        self.precerts_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches(&self) {
        self.certs_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_abandoned(&self) {
        self.batches_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entries_processed(&self) -> u64 {
        self.entries_processed.load(Ordering::Relaxed)
    }

    pub fn precerts_seen(&self) -> u64 {
        self.precerts_seen.load(Ordering::Relaxed)
    }

    pub fn certs_matched(&self) -> u64 {
        self.certs_matched.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn batches_abandoned(&self) -> u64 {
        self.batches_abandoned.load(Ordering::Relaxed)
    }
}

/// Final figures of a completed scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub tree_size: u64,
    pub start_index: u64,
    pub entries_processed: u64,
    pub precerts_seen: u64,
    pub certs_matched: u64,
    pub decode_failures: u64,
    pub batches_abandoned: u64,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub(crate) fn from_counters(
        counters: &ScanCounters,
        tree_size: u64,
        start_index: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            tree_size,
            start_index,
            entries_processed: counters.entries_processed(),
            precerts_seen: counters.precerts_seen(),
            certs_matched: counters.certs_matched(),
            decode_failures: counters.decode_failures(),
            batches_abandoned: counters.batches_abandoned(),
            elapsed,
        }
    }

    /// Format the summary as a human-readable string
    pub fn format_summary(&self) -> String {
        format!(
            "{} entries processed | {} matches | {} precerts | {} decode failures | elapsed: {}",
            self.entries_processed,
            self.certs_matched,
            self.precerts_seen,
            self.decode_failures,
            format_duration(self.elapsed.as_secs())
        )
    }
}

/// Format a number of seconds as `1h 2m 3s`
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
