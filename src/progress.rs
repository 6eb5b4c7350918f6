// src/progress.rs
//! Periodic scan progress: throughput and ETA

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::stats::{format_duration, ScanCounters};

/// Terminal spinner carrying the latest status line.
///
/// When disabled, status lines go to the log instead.
#[derive(Clone)]
pub struct ProgressIndicator {
    spinner: Option<ProgressBar>,
}

impl ProgressIndicator {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { spinner: None };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner: Some(spinner),
        }
    }

    /// Indicator that only logs
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Show a status line
    pub fn set_status(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.set_message(line),
            None => info!("{}", line),
        }
    }

    /// Temporarily hide the spinner while `f` writes to the terminal
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    pub fn finish(&self) {
        if let Some(ref spinner) = self.spinner {
            spinner.finish_and_clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.spinner.is_some()
    }
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::disabled()
    }
}

/// `Processed: N certs (to index I). Throughput: T ETA: E`
pub fn status_line(processed: u64, tree_size: u64, start_index: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let throughput = if secs > 0.0 {
        processed as f64 / secs
    } else {
        0.0
    };

    let remaining = tree_size
        .saturating_sub(start_index)
        .saturating_sub(processed);
    let eta = if throughput > 0.0 {
        format_duration((remaining as f64 / throughput) as u64)
    } else {
        "unknown".to_string()
    };

    format!(
        "Processed: {} certs (to index {}). Throughput: {:.2} ETA: {}",
        processed,
        start_index + processed,
        throughput,
        eta
    )
}

/// Background task printing a status line every `interval` for one scan.
///
/// Stopped explicitly with [`stop`](Self::stop); dropping the reporter
/// aborts the task so it can never outlive the scan.
pub struct ProgressReporter {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn start(
        counters: Arc<ScanCounters>,
        tree_size: u64,
        start_index: u64,
        interval: Duration,
        indicator: ProgressIndicator,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        indicator.set_status(status_line(
                            counters.entries_processed(),
                            tree_size,
                            start_index,
                            started.elapsed(),
                        ));
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            indicator.finish();
        });

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Signal the task and wait for it to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Progress reporter task failed: {}", e);
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
