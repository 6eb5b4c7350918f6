// src/test_support.rs
//! Fixtures shared by unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::ct_log::{LeafInput, LogClient, MerkleTreeLeaf, SignedTreeHead};

/// Self-signed certificate with the given subject CN and DNS alt names
pub(crate) fn self_signed_der(common_name: &str, alt_names: &[&str]) -> Vec<u8> {
    let mut params =
        rcgen::CertificateParams::new(alt_names.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, common_name);

    let cert = rcgen::Certificate::from_params(params).unwrap();
    cert.serialize_der().unwrap()
}

/// Self-signed certificate whose subject carries two CN attributes
pub(crate) fn two_common_names_der(first: &str, second: &str) -> Vec<u8> {
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new());
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, first);
    // Same CN OID under a distinct key, so rcgen keeps both attributes
    params
        .distinguished_name
        .push(rcgen::DnType::CustomDnType(vec![2, 5, 4, 3]), second);

    let cert = rcgen::Certificate::from_params(params).unwrap();
    cert.serialize_der().unwrap()
}

/// Encoded X.509 leaf wrapping a fresh certificate
pub(crate) fn x509_leaf(common_name: &str, alt_names: &[&str]) -> Vec<u8> {
    let der = self_signed_der(common_name, alt_names);
    MerkleTreeLeaf::x509(1_700_000_000_000, &der).encode()
}

/// Encoded precertificate leaf
pub(crate) fn precert_leaf() -> Vec<u8> {
    MerkleTreeLeaf::precert(1_700_000_000_000, [7; 32], &[0x30, 0x00]).encode()
}

/// In-memory log with scriptable misbehaviour
pub(crate) struct MemoryLog {
    leaves: Vec<LeafInput>,
    max_per_call: usize,
    failures_remaining: AtomicU32,
    fail_sth: bool,
    ignore_end: bool,
    delay: Duration,
    calls: Mutex<Vec<(u64, u64)>>,
}

impl MemoryLog {
    pub(crate) fn new(leaves: Vec<LeafInput>) -> Self {
        Self {
            leaves,
            max_per_call: usize::MAX,
            failures_remaining: AtomicU32::new(0),
            fail_sth: false,
            ignore_end: false,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer at most `n` entries per get-entries call
    pub(crate) fn with_max_per_call(mut self, n: usize) -> Self {
        self.max_per_call = n;
        self
    }

    /// Fail the next `n` get-entries calls
    pub(crate) fn failing_first(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn always_failing(self) -> Self {
        self.failing_first(u32::MAX)
    }

    pub(crate) fn failing_sth(mut self) -> Self {
        self.fail_sth = true;
        self
    }

    /// Return everything from `start` onwards, whatever `end` says
    pub(crate) fn ignoring_end(mut self) -> Self {
        self.ignore_end = true;
        self
    }

    /// Take `delay` to answer each get-entries call
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every (start, end) get-entries request seen so far
    pub(crate) fn calls(&self) -> Vec<(u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogClient for MemoryLog {
    async fn get_sth(&self) -> Result<SignedTreeHead> {
        if self.fail_sth {
            anyhow::bail!("log unreachable");
        }

        Ok(SignedTreeHead {
            tree_size: self.leaves.len() as u64,
            timestamp: 1_700_000_000_000,
            sha256_root_hash: String::new(),
            tree_head_signature: String::new(),
        })
    }

    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<LeafInput>> {
        self.calls.lock().unwrap().push((start, end));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failing {
            anyhow::bail!("transient failure");
        }

        let start = start as usize;
        let stop = if self.ignore_end {
            self.leaves.len()
        } else {
            (end as usize + 1).min(self.leaves.len())
        };
        let stop = stop.min(start.saturating_add(self.max_per_call));

        Ok(self.leaves[start.min(stop)..stop].to_vec())
    }
}
