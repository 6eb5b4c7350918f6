// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cert_parser::ParsedCertificate;

/// Kind of log entry a result was produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Certificate,
    Precertificate,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Certificate => write!(f, "certificate"),
            EntryKind::Precertificate => write!(f, "precertificate"),
        }
    }
}

/// Represents a reported log entry for output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Unix timestamp when the entry was reported
    pub timestamp: u64,

    /// Log the entry was found in
    pub log_url: Option<String>,

    /// Entry index in the log
    pub index: u64,

    pub kind: EntryKind,

    /// Subject Common Name
    pub common_name: Option<String>,

    /// Subject Alternative Names
    #[serde(default)]
    pub alt_names: Vec<String>,

    pub issuer: Option<String>,

    /// Certificate validity start time (Unix timestamp)
    pub not_before: Option<i64>,

    /// Certificate validity end time (Unix timestamp)
    pub not_after: Option<i64>,

    /// SHA-256 of the certificate DER, hex encoded
    pub fingerprint: Option<String>,
}

impl MatchResult {
    /// Result for a matching X.509 certificate
    pub fn from_certificate(index: u64, cert: &ParsedCertificate<'_>) -> Self {
        Self {
            timestamp: now(),
            log_url: None,
            index,
            kind: EntryKind::Certificate,
            common_name: cert.common_name().map(str::to_string),
            alt_names: cert.alt_names().into_iter().map(str::to_string).collect(),
            issuer: Some(cert.issuer()),
            not_before: Some(cert.not_before()),
            not_after: Some(cert.not_after()),
            fingerprint: Some(cert.fingerprint()),
        }
    }

    /// Result for a precertificate; its contents are not decoded
    pub fn precert(index: u64) -> Self {
        Self {
            timestamp: now(),
            log_url: None,
            index,
            kind: EntryKind::Precertificate,
            common_name: None,
            alt_names: Vec::new(),
            issuer: None,
            not_before: None,
            not_after: None,
            fingerprint: None,
        }
    }

    pub fn with_log_url(mut self, log_url: &str) -> Self {
        self.log_url = Some(log_url.to_string());
        self
    }

    /// Best single name to display: CN, else first alt name
    pub fn display_name(&self) -> Option<&str> {
        self.common_name
            .as_deref()
            .or_else(|| self.alt_names.first().map(String::as_str))
    }
}

fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
