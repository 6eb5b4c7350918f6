// src/lib.rs
// Library interface for ct-audit
pub mod cert_parser;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod matcher;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod stats;
pub mod types;

#[cfg(test)]
mod test_support;
