// src/scanner/fetcher.rs
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::queue::{QueueReceiver, QueueSender};
use super::ranges::BatchRange;
use crate::ct_log::{LeafInput, LogClient};
use crate::stats::ScanCounters;

/// One log entry waiting to be classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyJob {
    /// Raw MerkleTreeLeaf bytes returned by the log
    pub leaf: LeafInput,
    /// Index of the entry in the log
    pub index: u64,
}

/// How a fetch worker reacts to failed get-entries calls.
///
/// The default retries forever with no delay, so a batch is never skipped.
/// A persistently broken log will then keep the scan spinning; set
/// `max_attempts` to trade completeness for termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before the batch is abandoned
    pub max_attempts: Option<u32>,
    /// Delay after the first failure; doubles per consecutive failure
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    fn next_backoff(&self, current: Duration) -> Duration {
        std::cmp::min(current.saturating_mul(2), self.max_backoff)
    }

    fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("gave up on entries {start}-{end} after {attempts} attempts: {last_error:#}")]
    Abandoned {
        start: u64,
        end: u64,
        attempts: u32,
        last_error: anyhow::Error,
    },

    #[error("classify queue closed")]
    QueueClosed,
}

/// Worker loop: turns batches from `ranges` into jobs on `jobs` until the
/// batch queue is closed and drained.
pub(crate) async fn fetch_worker(
    worker_id: usize,
    client: Arc<dyn LogClient>,
    ranges: QueueReceiver<BatchRange>,
    jobs: QueueSender<ClassifyJob>,
    retry: RetryPolicy,
    counters: Arc<ScanCounters>,
) {
    debug!("Fetcher {} started", worker_id);

    while let Some(range) = ranges.pop().await {
        match fetch_range(client.as_ref(), range, &jobs, &retry).await {
            Ok(()) => {
                debug!("Fetcher {} completed batch {}-{}", worker_id, range.start, range.end);
            }
            Err(e @ FetchError::Abandoned { .. }) => {
                error!("Fetcher {}: {}", worker_id, e);
                counters.increment_abandoned();
            }
            Err(FetchError::QueueClosed) => {
                error!(
                    "Fetcher {}: classify queue closed with batch {}-{} in flight",
                    worker_id, range.start, range.end
                );
                break;
            }
        }
    }

    debug!("Fetcher {} finished", worker_id);
}

/// Deliver every entry of `range` to `jobs`, in index order.
///
/// Logs may answer with fewer entries than requested, so the remainder is
/// requested again until the cursor passes `range.end`. Entries are only
/// emitted after a successful call, so a retry never duplicates them.
pub(crate) async fn fetch_range(
    client: &dyn LogClient,
    range: BatchRange,
    jobs: &QueueSender<ClassifyJob>,
    retry: &RetryPolicy,
) -> Result<(), FetchError> {
    let mut cursor = range.start;
    let mut failures = 0u32;
    let mut backoff = retry.initial_backoff;

    while cursor <= range.end {
        let result = client
            .get_entries(cursor, range.end)
            .await
            .and_then(|leaves| {
                if leaves.is_empty() {
                    anyhow::bail!("log returned no entries");
                }
                Ok(leaves)
            });

        match result {
            Ok(leaves) => {
                failures = 0;
                backoff = retry.initial_backoff;

                // never trust a log to stay inside the requested range
                let wanted = (range.end - cursor + 1) as usize;
                for leaf in leaves.into_iter().take(wanted) {
                    jobs.push(ClassifyJob { leaf, index: cursor })
                        .await
                        .map_err(|_| FetchError::QueueClosed)?;
                    cursor += 1;
                }
            }
            Err(e) => {
                failures += 1;
                warn!(
                    "Problem fetching entries {}-{} from log (attempt {}): {:#}",
                    cursor, range.end, failures, e
                );

                if retry.exhausted(failures) {
                    return Err(FetchError::Abandoned {
                        start: cursor,
                        end: range.end,
                        attempts: failures,
                        last_error: e,
                    });
                }

                if backoff.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(backoff).await;
                    backoff = retry.next_backoff(backoff);
                }
            }
        }
    }

    Ok(())
}
