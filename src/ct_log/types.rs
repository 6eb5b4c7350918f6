// src/ct_log/types.rs
use serde::{Deserialize, Serialize};

/// Response from CT log's get-sth endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub sha256_root_hash: String,
    #[serde(default)]
    pub tree_head_signature: String,
}

/// Single entry from CT log's get-entries endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub leaf_input: String, // base64-encoded MerkleTreeLeaf
    #[serde(default)]
    pub extra_data: String, // base64-encoded chain, unused by the scanner
}

/// Response wrapper for get-entries endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct GetEntriesResponse {
    pub entries: Vec<LogEntry>,
}

/// Raw, still-encoded MerkleTreeLeaf bytes as returned by the log
pub type LeafInput = Vec<u8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sth_without_optional_fields() {
        let sth: SignedTreeHead =
            serde_json::from_str(r#"{"tree_size": 42, "timestamp": 1700000000000}"#).unwrap();
        assert_eq!(sth.tree_size, 42);
        assert!(sth.sha256_root_hash.is_empty());
    }

    #[test]
    fn test_entries_response() {
        let json = r#"{"entries": [{"leaf_input": "AAA=", "extra_data": ""}, {"leaf_input": "AQE="}]}"#;
        let resp: GetEntriesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.entries.len(), 2);
        assert_eq!(resp.entries[1].leaf_input, "AQE=");
        assert!(resp.entries[1].extra_data.is_empty());
    }
}
