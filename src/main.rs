// src/main.rs
use anyhow::Context;
use clap::Parser;
use ct_audit::cli::{Cli, OutputFormat};
use ct_audit::config::Config;
use ct_audit::ct_log::CtLogClient;
use ct_audit::output::{human, json, OutputManager};
use ct_audit::progress::ProgressIndicator;
use ct_audit::scanner::Scanner;
use ct_audit::types::MatchResult;
use is_terminal::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file, if any, then apply CLI overrides
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(Path::new(path))?,
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);

    // Initialize logging; RUST_LOG wins over flags and config
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let log_url = config
        .log
        .url
        .clone()
        .context("No log URL given: pass --log-url or set [log] url in the config file")?;

    let options = config.scan_options()?;
    tracing::info!("Scanning {} with {:?}", log_url, options);

    let client = CtLogClient::new(&log_url, Duration::from_secs(config.log.timeout_secs))?;

    // Progress goes to stderr, so only spin when stderr is a terminal
    let progress = ProgressIndicator::new(cli.should_show_progress() && std::io::stderr().is_terminal());

    let scanner = Scanner::new(Arc::new(client), options)?.with_progress(progress.clone());

    // Create output manager
    let mut output_manager = OutputManager::new();

    match cli.output_format() {
        OutputFormat::Human => {
            if let Some(ref path) = cli.output {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output file {}", path))?;
                output_manager.add_handler(Arc::new(human::HumanOutput::to_file(file)));
                tracing::info!("Writing human-readable output to: {}", path);
            } else {
                output_manager.add_handler(Arc::new(human::HumanOutput::new()));
            }
        }
        OutputFormat::Json => {
            if let Some(ref path) = cli.output {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output file {}", path))?;
                output_manager.add_handler(Arc::new(json::JsonOutput::to_file(file)));
                tracing::info!("Writing JSON output to: {}", path);
            } else {
                output_manager.add_handler(Arc::new(json::JsonOutput::new()));
            }
        }
    }

    let output = Arc::new(output_manager);

    let found_cert = {
        let output = Arc::clone(&output);
        let progress = progress.clone();
        let log_url = log_url.clone();
        move |index: u64, cert: &ct_audit::cert_parser::ParsedCertificate<'_>| {
            let result = MatchResult::from_certificate(index, cert).with_log_url(&log_url);
            if let Err(e) = progress.suspend(|| output.emit(&result)) {
                tracing::warn!("Failed to write match at index {}: {}", index, e);
            }
        }
    };

    let found_precert = {
        let output = Arc::clone(&output);
        let progress = progress.clone();
        let show_precerts = cli.show_precerts;
        move |index: u64, _payload: &str| {
            if !show_precerts {
                return;
            }
            let result = MatchResult::precert(index).with_log_url(&log_url);
            if let Err(e) = progress.suspend(|| output.emit(&result)) {
                tracing::warn!("Failed to write precert at index {}: {}", index, e);
            }
        }
    };

    let result = scanner.scan(found_cert, found_precert).await;
    progress.finish();
    output.flush()?;

    let summary = result?;
    eprintln!("\nScan complete: {}", summary.format_summary());
    eprintln!("  Range: [{}, {})", summary.start_index, summary.tree_size);

    Ok(())
}
