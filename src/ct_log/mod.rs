// src/ct_log/mod.rs
pub mod client;
pub mod leaf;
pub mod types;

pub use client::{CtLogClient, LogClient};
pub use leaf::{LeafError, LogEntryType, MerkleTreeLeaf};
pub use types::{LeafInput, LogEntry, SignedTreeHead};
