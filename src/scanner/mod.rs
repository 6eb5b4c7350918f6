// src/scanner/mod.rs
//! Full-log scan: fetch every entry from `start_index` up to the current
//! tree size and classify each one.
//!
//! Two worker pools connected by bounded queues:
//!
//! ```text
//! batches ──▶ [fetch queue] ──▶ fetchers ──▶ [classify queue] ──▶ classifiers ──▶ callbacks
//! ```
//!
//! Fetchers are async tasks (network bound); classifiers run on blocking
//! threads (decode bound). Shutdown is a two-phase drain: the fetch queue is
//! closed once every batch is queued, the classify queue only after every
//! fetcher has exited.

pub mod classifier;
pub mod fetcher;
pub mod queue;
pub mod ranges;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cert_parser::ParsedCertificate;
use crate::ct_log::LogClient;
use crate::matcher::{MatchAll, Matcher};
use crate::progress::{ProgressIndicator, ProgressReporter};
use crate::stats::{format_duration, ScanCounters, ScanSummary};
use classifier::{classify_worker, CertCallback, Classifier, PrecertCallback};
use fetcher::{fetch_worker, ClassifyJob};
use queue::work_queue;
use ranges::{batch_ranges, BatchRange};

pub use fetcher::RetryPolicy;

/// Configuration of a scan; immutable once the scan starts
#[derive(Clone)]
pub struct ScanOptions {
    /// Predicate selecting which certificates are reported
    pub matcher: Arc<dyn Matcher>,
    /// Maximum number of entries per fetch batch
    pub batch_size: u64,
    /// Number of concurrent fetch workers
    pub fetch_parallelism: usize,
    /// Number of concurrent classify workers
    pub classify_parallelism: usize,
    /// Log index to start scanning at
    pub start_index: u64,
    pub fetch_queue_capacity: usize,
    /// Bound on undecoded leaves held in memory
    pub classify_queue_capacity: usize,
    pub retry: RetryPolicy,
    pub report_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            matcher: Arc::new(MatchAll),
            batch_size: 1000,
            fetch_parallelism: 2,
            classify_parallelism: 2,
            start_index: 0,
            fetch_queue_capacity: 100,
            classify_queue_capacity: 5000,
            retry: RetryPolicy::default(),
            report_interval: Duration::from_secs(1),
        }
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("batch_size", &self.batch_size)
            .field("fetch_parallelism", &self.fetch_parallelism)
            .field("classify_parallelism", &self.classify_parallelism)
            .field("start_index", &self.start_index)
            .field("fetch_queue_capacity", &self.fetch_queue_capacity)
            .field("classify_queue_capacity", &self.classify_queue_capacity)
            .field("retry", &self.retry)
            .field("report_interval", &self.report_interval)
            .finish_non_exhaustive()
    }
}

impl ScanOptions {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than 0");
        }
        if self.fetch_parallelism == 0 {
            anyhow::bail!("fetch_parallelism must be greater than 0");
        }
        if self.classify_parallelism == 0 {
            anyhow::bail!("classify_parallelism must be greater than 0");
        }
        if self.fetch_queue_capacity == 0 || self.classify_queue_capacity == 0 {
            anyhow::bail!("queue capacities must be greater than 0");
        }
        if self.report_interval.is_zero() {
            anyhow::bail!("report_interval must be greater than 0");
        }
        Ok(())
    }
}

/// Scans every entry of one CT log
pub struct Scanner {
    client: Arc<dyn LogClient>,
    options: ScanOptions,
    counters: Mutex<Arc<ScanCounters>>,
    progress: ProgressIndicator,
    scanning: AtomicBool,
}

impl Scanner {
    /// Create a scanner talking to the log through `client`
    pub fn new(client: Arc<dyn LogClient>, options: ScanOptions) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            client,
            options,
            counters: Mutex::new(Arc::new(ScanCounters::new())),
            progress: ProgressIndicator::disabled(),
            scanning: AtomicBool::new(false),
        })
    }

    /// Show status lines on a terminal spinner instead of the log
    pub fn with_progress(mut self, progress: ProgressIndicator) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Live counters of the current (or last) scan
    pub fn counters(&self) -> Arc<ScanCounters> {
        Arc::clone(&self.counters.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Scan the log.
    ///
    /// `found_cert` is called with the index and certificate of every X.509
    /// entry accepted by the matcher; `found_precert` with the index of every
    /// precertificate and an empty payload. Callbacks run on classify worker
    /// threads, concurrently and in no particular index order.
    ///
    /// Returns once every entry has been processed. Fails immediately if the
    /// tree head cannot be fetched, and after the drain if any batch was
    /// abandoned under a bounded [`RetryPolicy`] or a worker died.
    pub async fn scan<C, P>(&self, found_cert: C, found_precert: P) -> Result<ScanSummary>
    where
        C: Fn(u64, &ParsedCertificate<'_>) + Send + Sync + 'static,
        P: Fn(u64, &str) + Send + Sync + 'static,
    {
        if self.scanning.swap(true, Ordering::AcqRel) {
            anyhow::bail!("A scan is already running on this scanner");
        }
        let _running = RunningScan(&self.scanning);

        let opts = &self.options;
        info!("Starting up...");

        // Each scan gets its own counters; workers of an earlier, cancelled
        // scan can never touch them.
        let counters = Arc::new(ScanCounters::new());
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&counters);

        let sth = self
            .client
            .get_sth()
            .await
            .context("Failed to fetch STH")?;
        let tree_size = sth.tree_size;
        info!("Got STH with {} certs", tree_size);

        let started = Instant::now();
        let reporter = ProgressReporter::start(
            Arc::clone(&counters),
            tree_size,
            opts.start_index,
            opts.report_interval,
            self.progress.clone(),
        );

        let (fetch_tx, fetch_rx) = work_queue::<BatchRange>(opts.fetch_queue_capacity);
        let (job_tx, job_rx) = work_queue::<ClassifyJob>(opts.classify_queue_capacity);

        let found_cert: Arc<CertCallback> = Arc::new(found_cert);
        let found_precert: Arc<PrecertCallback> = Arc::new(found_precert);
        let classifier = Arc::new(Classifier::new(
            Arc::clone(&opts.matcher),
            Arc::clone(&counters),
            found_cert,
            found_precert,
        ));

        let cancelled = Arc::new(AtomicBool::new(false));
        let mut classifiers = WorkerGroup::new("Classifier", Arc::clone(&cancelled));
        for id in 0..opts.classify_parallelism {
            let jobs = job_rx.clone();
            let classifier = Arc::clone(&classifier);
            let cancelled = Arc::clone(&cancelled);
            classifiers.push(tokio::task::spawn_blocking(move || {
                classify_worker(id, jobs, classifier, &cancelled)
            }));
        }
        drop(job_rx);

        let mut fetchers = WorkerGroup::new("Fetcher", Arc::clone(&cancelled));
        for id in 0..opts.fetch_parallelism {
            fetchers.push(tokio::spawn(fetch_worker(
                id,
                Arc::clone(&self.client),
                fetch_rx.clone(),
                job_tx.clone(),
                opts.retry.clone(),
                Arc::clone(&counters),
            )));
        }
        drop(fetch_rx);

        let mut queued = 0usize;
        for range in batch_ranges(opts.start_index, tree_size, opts.batch_size) {
            if fetch_tx.push(range).await.is_err() {
                error!("All fetchers exited with batches still unqueued");
                break;
            }
            queued += 1;
        }
        fetch_tx.close();
        debug!("Queued {} batches", queued);

        // Phase one: no fetcher can produce jobs past this point.
        let mut failed_workers = fetchers.join().await;
        job_tx.close();

        // Phase two: classifiers drain what is left.
        failed_workers += classifiers.join().await;

        reporter.stop().await;

        let summary = ScanSummary::from_counters(
            &counters,
            tree_size,
            opts.start_index,
            started.elapsed(),
        );
        info!(
            "Completed {} certs in {}",
            summary.entries_processed,
            format_duration(summary.elapsed.as_secs())
        );
        info!("Saw {} precerts", summary.precerts_seen);

        if failed_workers > 0 {
            anyhow::bail!("Scan incomplete: {} worker tasks failed", failed_workers);
        }
        if summary.batches_abandoned > 0 {
            anyhow::bail!(
                "Scan incomplete: {} batches abandoned after exhausting retries",
                summary.batches_abandoned
            );
        }

        Ok(summary)
    }
}

/// Clears the running flag however the scan ends
struct RunningScan<'a>(&'a AtomicBool);

impl Drop for RunningScan<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Worker tasks of one scan.
///
/// Dropping a group that has not been joined, as happens when the scan
/// future is dropped, aborts its async tasks and tells blocking workers to
/// stop at their next job.
struct WorkerGroup {
    kind: &'static str,
    handles: Vec<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

impl WorkerGroup {
    fn new(kind: &'static str, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            kind,
            handles: Vec::new(),
            cancelled,
        }
    }

    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Wait for every worker, returning how many of them failed
    async fn join(&mut self) -> usize {
        let mut failed = 0;
        for result in join_all(self.handles.iter_mut()).await {
            if let Err(e) = result {
                error!("{} task failed: {}", self.kind, e);
                failed += 1;
            }
        }
        self.handles.clear();
        failed
    }
}

impl Drop for WorkerGroup {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        debug!("Cancelling {} {} tasks", self.handles.len(), self.kind);
        self.cancelled.store(true, Ordering::Release);
        for handle in &self.handles {
            handle.abort();
        }
    }
}
