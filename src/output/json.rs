// src/output/json.rs
//! JSON Lines (JSONL) output handler

use crate::output::{OutputHandler, SharedWriter};
use crate::types::MatchResult;
use std::io::Write;

/// Outputs one JSON object per line (JSONL/NDJSON format)
pub struct JsonOutput {
    writer: SharedWriter,
}

impl JsonOutput {
    /// Create a new JsonOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: SharedWriter::stdout(),
        }
    }

    /// Create a new JsonOutput that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self::to_writer(Box::new(file))
    }

    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: SharedWriter::new(writer),
        }
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputHandler for JsonOutput {
    fn emit_match(&self, result: &MatchResult) -> anyhow::Result<()> {
        let json = serde_json::to_string(result)?;
        self.writer.with(|w| writeln!(w, "{}", json))
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.writer.with(|_| Ok(()))
    }
}
