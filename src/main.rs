//! # Citation Checker Main Driver
//!
//! ## Purpose
//! Main entry point for the citation checker. Loads configuration, builds the
//! remote-service clients, runs the enrichment pipeline over the input text,
//! and prints the per-citation report.
//!
//! ## Input/Output Specification
//! - **Input**: A text file path or literal text, configuration file,
//!   environment variables
//! - **Output**: Per-citation report (human-readable or JSON) on stdout
//! - **Exit**: Non-zero only for configuration or input errors; remote
//!   failures are reported inline and are not a process failure
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Build the analysis and lookup clients (fail fast on missing credentials)
//! 4. Run the pipeline, draining gracefully on SIGINT
//! 5. Print the report and the failure summary

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use citation_pipeline::clients::{AnalysisClient, LookupClient};
use citation_pipeline::errors::CiteError;
use citation_pipeline::pipeline::BatchReport;
use citation_pipeline::{CitationPipeline, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("citation-checker")
        .version("0.1.0")
        .author("Legal Citation Team")
        .about("Checks legal citations for accuracy using AI analysis and case-law lookup")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Text file to scan for citations (PDFs must be converted to text first)"),
        )
        .arg(
            Arg::new("text")
                .short('t')
                .long("text")
                .value_name("TEXT")
                .help("Literal text to scan, instead of a file")
                .conflicts_with("input"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("batch-size")
                .short('b')
                .long("batch-size")
                .value_name("N")
                .help("Citations per batch")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("concurrency")
                .short('j')
                .long("concurrency")
                .value_name("N")
                .help("Maximum citations enriched at once")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit the report as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration; this fails fast on missing credentials
    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    if let Some(batch_size) = matches.get_one::<usize>("batch-size") {
        config.pipeline.batch_size = *batch_size;
    }
    if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
        config.pipeline.max_concurrent_citations = *concurrency;
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config)?;

    let text = match matches.get_one::<String>("text") {
        Some(text) => text.clone(),
        None => {
            let path = matches
                .get_one::<String>("input")
                .context("Provide a text file path or --text")?;
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {}", path))?
        }
    };

    let analysis = Arc::new(AnalysisClient::new(&config.analysis)?);
    let lookup = Arc::new(LookupClient::new(&config.lookup)?);
    let pipeline = CitationPipeline::new(config, analysis, lookup)?;

    // SIGINT drains in-flight work and reports what completed
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                tracing::warn!("Received SIGINT, draining in-flight citations");
                cancel.cancel();
            }
        });
    }

    let report = pipeline.check_text_with_cancel(&text, &cancel).await;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level).map_err(|_| {
        CiteError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        }
    })?;

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .init();
    }

    Ok(())
}

/// Print the human-readable per-citation report
fn print_report(report: &BatchReport) {
    for entry in &report.entries {
        println!("Citation: {}", entry.citation.text);

        match &entry.analysis {
            Ok(verdict) => println!("AI Feedback: {}", verdict.verdict),
            Err(failure) => println!(
                "AI Feedback: unavailable ({} error: {})",
                failure.kind.as_str(),
                failure.message
            ),
        }

        match &entry.lookup {
            Ok(Some(record)) => {
                let name = record.case_name.as_deref().unwrap_or("(unnamed case)");
                println!("Case Record: {}", name);
                if let Some(court) = &record.court {
                    println!("  Court: {}", court);
                }
                if let Some(date) = &record.date_filed {
                    println!("  Filed: {}", date);
                }
                if let Some(docket) = &record.docket_number {
                    println!("  Docket: {}", docket);
                }
                if !record.citations.is_empty() {
                    println!("  Citations: {}", record.citations.join("; "));
                }
            }
            Ok(None) => println!("Case Record: no matching case found"),
            Err(failure) => println!(
                "Case Record: unavailable ({} error: {})",
                failure.kind.as_str(),
                failure.message
            ),
        }

        println!("{}", "-".repeat(80));
    }

    println!(
        "Processed {} citations: {} analysis failures, {} lookup failures",
        report.total(),
        report.analysis_failures,
        report.lookup_failures
    );
}
