// src/scanner/classifier.rs
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use super::fetcher::ClassifyJob;
use super::queue::QueueReceiver;
use crate::cert_parser::ParsedCertificate;
use crate::ct_log::{LogEntryType, MerkleTreeLeaf};
use crate::matcher::Matcher;
use crate::stats::ScanCounters;

/// Callback for matching X.509 certificates: `(index, certificate)`
pub type CertCallback = dyn Fn(u64, &ParsedCertificate<'_>) + Send + Sync;

/// Callback for precertificates: `(index, payload)`; the payload is always empty
pub type PrecertCallback = dyn Fn(u64, &str) + Send + Sync;

/// Decodes leaves, applies the matcher and invokes the caller's callbacks
pub(crate) struct Classifier {
    matcher: Arc<dyn Matcher>,
    counters: Arc<ScanCounters>,
    found_cert: Arc<CertCallback>,
    found_precert: Arc<PrecertCallback>,
}

impl Classifier {
    pub(crate) fn new(
        matcher: Arc<dyn Matcher>,
        counters: Arc<ScanCounters>,
        found_cert: Arc<CertCallback>,
        found_precert: Arc<PrecertCallback>,
    ) -> Self {
        Self {
            matcher,
            counters,
            found_cert,
            found_precert,
        }
    }

    /// Process the leaf found at `index`.
    ///
    /// Every call counts as processed, including entries dropped because they
    /// fail to decode.
    pub(crate) fn process_entry(&self, index: u64, leaf_input: &[u8]) {
        self.counters.increment_processed();

        let leaf = match MerkleTreeLeaf::parse(leaf_input) {
            Ok(leaf) => leaf,
            Err(e) => {
                warn!("Failed to parse MerkleTreeLeaf at index {}: {}", index, e);
                self.counters.increment_decode_failures();
                return;
            }
        };

        match leaf.timestamped_entry.entry {
            LogEntryType::X509(der) => {
                let cert = match ParsedCertificate::from_der(der) {
                    Ok(cert) => cert,
                    Err(e) => {
                        warn!("Failed to parse cert at index {}: {}", index, e);
                        self.counters.increment_decode_failures();
                        return;
                    }
                };

                if self.matcher.certificate_matches(&cert) {
                    self.counters.increment_matches();
                    (self.found_cert)(index, &cert);
                }
            }
            LogEntryType::Precert { .. } => {
                debug!("Precert not yet supported (index {})", index);
                self.counters.increment_precerts();
                (self.found_precert)(index, "");
            }
        }
    }
}

/// Worker loop, run on a blocking thread: classifies jobs until the queue is
/// closed and drained, or until `cancelled` is set.
pub(crate) fn classify_worker(
    worker_id: usize,
    jobs: QueueReceiver<ClassifyJob>,
    classifier: Arc<Classifier>,
    cancelled: &AtomicBool,
) {
    debug!("Classifier {} started", worker_id);

    let mut processed = 0u64;
    while let Some(job) = jobs.blocking_pop() {
        if cancelled.load(Ordering::Acquire) {
            debug!("Classifier {} cancelled", worker_id);
            return;
        }
        classifier.process_entry(job.index, &job.leaf);
        processed += 1;
    }

    debug!("Classifier {} finished after {} entries", worker_id, processed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchAll, MatchNone, MatchSubjectRegex};
    use crate::scanner::queue::work_queue;
    use crate::test_support::{precert_leaf, x509_leaf};
    use std::sync::Mutex;

    type Found = Arc<Mutex<Vec<(u64, String)>>>;

    fn classifier(matcher: Arc<dyn Matcher>) -> (Classifier, Arc<ScanCounters>, Found, Found) {
        let counters = Arc::new(ScanCounters::new());
        let certs: Found = Arc::default();
        let precerts: Found = Arc::default();

        let certs_sink = Arc::clone(&certs);
        let precerts_sink = Arc::clone(&precerts);
        let classifier = Classifier::new(
            matcher,
            Arc::clone(&counters),
            Arc::new(move |index, cert: &ParsedCertificate<'_>| {
                let cn = cert.common_name().unwrap_or_default().to_string();
                certs_sink.lock().unwrap().push((index, cn));
            }),
            Arc::new(move |index, payload: &str| {
                precerts_sink.lock().unwrap().push((index, payload.to_string()));
            }),
        );

        (classifier, counters, certs, precerts)
    }

    #[test]
    fn test_matching_cert_reported() {
        let (classifier, counters, certs, precerts) = classifier(Arc::new(MatchAll));

        classifier.process_entry(42, &x509_leaf("www.example.com", &[]));

        assert_eq!(*certs.lock().unwrap(), vec![(42, "www.example.com".to_string())]);
        assert!(precerts.lock().unwrap().is_empty());
        assert_eq!(counters.entries_processed(), 1);
        assert_eq!(counters.certs_matched(), 1);
    }

    #[test]
    fn test_non_matching_cert_counted_not_reported() {
        let matcher = MatchSubjectRegex::from_pattern(r"example\.com").unwrap();
        let (classifier, counters, certs, _) = classifier(Arc::new(matcher));

        classifier.process_entry(1, &x509_leaf("other.test", &["also.other.test"]));
        classifier.process_entry(2, &x509_leaf("other.test", &["cdn.example.com"]));

        assert_eq!(*certs.lock().unwrap(), vec![(2, "other.test".to_string())]);
        assert_eq!(counters.entries_processed(), 2);
        assert_eq!(counters.certs_matched(), 1);
    }

    #[test]
    fn test_precert_reported_regardless_of_matcher() {
        let (classifier, counters, certs, precerts) = classifier(Arc::new(MatchNone));

        classifier.process_entry(9, &precert_leaf());

        assert_eq!(*precerts.lock().unwrap(), vec![(9, String::new())]);
        assert!(certs.lock().unwrap().is_empty());
        assert_eq!(counters.precerts_seen(), 1);
        assert_eq!(counters.entries_processed(), 1);
    }

    #[test]
    fn test_malformed_leaf_dropped_but_counted() {
        let (classifier, counters, certs, precerts) = classifier(Arc::new(MatchAll));

        classifier.process_entry(3, b"garbage");

        assert!(certs.lock().unwrap().is_empty());
        assert!(precerts.lock().unwrap().is_empty());
        assert_eq!(counters.entries_processed(), 1);
        assert_eq!(counters.decode_failures(), 1);
    }

    #[test]
    fn test_bad_certificate_payload_dropped() {
        let (classifier, counters, certs, _) = classifier(Arc::new(MatchAll));

        let leaf = MerkleTreeLeaf::x509(1, b"not der").encode();
        classifier.process_entry(4, &leaf);

        assert!(certs.lock().unwrap().is_empty());
        assert_eq!(counters.decode_failures(), 1);
    }

    #[test]
    fn test_unknown_entry_type_dropped() {
        let (classifier, counters, certs, precerts) = classifier(Arc::new(MatchAll));

        let mut leaf = x509_leaf("www.example.com", &[]);
        leaf[11] = 2;
        classifier.process_entry(5, &leaf);

        assert!(certs.lock().unwrap().is_empty());
        assert!(precerts.lock().unwrap().is_empty());
        assert_eq!(counters.decode_failures(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_worker_leaves_queued_jobs() {
        let (classifier, counters, certs, _) = classifier(Arc::new(MatchAll));
        let (tx, rx) = work_queue(4);
        for index in 0..3 {
            let leaf = x509_leaf("www.example.com", &[]);
            tx.push(ClassifyJob { leaf, index }).await.unwrap();
        }
        tx.close();

        let classifier = Arc::new(classifier);
        let cancelled = AtomicBool::new(true);
        tokio::task::spawn_blocking(move || classify_worker(0, rx, classifier, &cancelled))
            .await
            .unwrap();

        assert!(certs.lock().unwrap().is_empty());
        assert_eq!(counters.entries_processed(), 0);
    }
}
