// src/ct_log/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{GetEntriesResponse, LeafInput, SignedTreeHead};

/// Transport used by the scanner to talk to a CT log.
///
/// `get_entries` takes an inclusive range and may return fewer entries than
/// requested; callers must ask again for the remainder.
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Current Signed Tree Head of the log
    async fn get_sth(&self) -> Result<SignedTreeHead>;

    /// Raw leaf inputs for indices `start..=end`, in index order
    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<LeafInput>>;
}

/// HTTP client for Certificate Transparency log RFC 6962 API
pub struct CtLogClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl CtLogClient {
    /// Create a new CT log client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .with_context(|| format!("Invalid CT log URL: {}", base_url))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported CT log URL scheme: {}", parsed.scheme());
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LogClient for CtLogClient {
    /// Endpoint: GET {base_url}/ct/v1/get-sth
    async fn get_sth(&self) -> Result<SignedTreeHead> {
        let url = format!("{}/ct/v1/get-sth", self.base_url);

        debug!("Fetching STH from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch STH")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "STH request failed with status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let sth: SignedTreeHead = response
            .json()
            .await
            .context("Failed to parse STH JSON")?;

        debug!(
            "STH received: tree_size={}, timestamp={}",
            sth.tree_size, sth.timestamp
        );

        Ok(sth)
    }

    /// Endpoint: GET {base_url}/ct/v1/get-entries?start={start}&end={end}
    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<LeafInput>> {
        let url = format!(
            "{}/ct/v1/get-entries?start={}&end={}",
            self.base_url, start, end
        );

        debug!("Fetching entries {}-{} from {}", start, end, self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch entries")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!("Rate limited by CT log: {}", self.base_url);
                anyhow::bail!("Rate limited (429)");
            }

            anyhow::bail!(
                "Get entries request failed with status {}: {}",
                status,
                body
            );
        }

        let entries_response: GetEntriesResponse = response
            .json()
            .await
            .context("Failed to parse entries JSON")?;

        let leaves = entries_response
            .entries
            .iter()
            .enumerate()
            .map(|(offset, entry)| {
                base64::engine::general_purpose::STANDARD
                    .decode(&entry.leaf_input)
                    .with_context(|| {
                        format!("Invalid base64 leaf_input at index {}", start + offset as u64)
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Received {} entries from {}", leaves.len(), self.base_url);

        Ok(leaves)
    }
}
