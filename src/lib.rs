//! # Legal Citation Enrichment Pipeline
//!
//! ## Overview
//! This library extracts legal citations from free text and enriches each one
//! through two independent remote services: an AI analysis service that judges
//! factual accuracy and Bluebook compliance, and a case-law lookup API that
//! supplies authoritative case metadata.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `extraction`: Citation extraction from raw text (the Citation Source boundary)
//! - `clients`: HTTP clients for the AI analysis and case-law lookup services
//! - `pipeline`: Batch scheduling, bounded-concurrency enrichment, and result aggregation
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Raw legal text (or text derived from a PDF by an external step)
//! - **Output**: A `BatchReport` enumerating every extracted citation with its
//!   AI verdict, case metadata, and any inline failure markers
//! - **Guarantees**: Output order matches extraction order; no citation is ever
//!   dropped or duplicated, regardless of partial remote failures
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use citation_pipeline::{Config, CitationPipeline};
//! use citation_pipeline::clients::{AnalysisClient, LookupClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let analysis = Arc::new(AnalysisClient::new(&config.analysis)?);
//!     let lookup = Arc::new(LookupClient::new(&config.lookup)?);
//!     let pipeline = CitationPipeline::new(config, analysis, lookup)?;
//!     let report = pipeline.check_text("Roe v. Wade, 410 U.S. 113 (1973)").await;
//!     println!("{} citations, {} failures", report.entries.len(), report.failure_total());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod clients;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod pipeline;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{CiteError, Result};
pub use extraction::CitationExtractor;
pub use pipeline::{BatchReport, CitationPipeline};

use serde::{Deserialize, Serialize};

/// A citation extracted from the source text, identified by its 0-based
/// position in the extraction order. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCitation {
    /// 0-based position in the extraction order
    pub index: usize,
    /// Full citation text as matched
    pub text: String,
    /// Normalized citation (whitespace collapsed, stable for deduplication)
    pub normalized: String,
    /// Party names, when the pattern captured them ("Roe v. Wade")
    pub case_name: Option<String>,
    /// Reporter volume number
    pub volume: Option<String>,
    /// Reporter abbreviation
    pub reporter: Option<String>,
    /// First page
    pub page: Option<String>,
    /// Decision year
    pub year: Option<u32>,
    /// Byte offset of the match in the cleaned source text
    pub position: usize,
    /// Surrounding text window, forwarded to the analysis service
    pub context: Option<String>,
}

/// Failure categories for a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Timeout, network failure, 5xx, or rate limiting; safe to retry
    Transient,
    /// The service rejected the request itself (4xx); retrying cannot help
    Permanent,
}

/// Failure marker recorded on an [`EnrichedCitation`] when a remote call
/// fails. This is data carried in the report, not a run-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    pub kind: FailureKind,
    pub message: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Server-requested backoff, when one was provided
    pub retry_after_secs: Option<u64>,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
        }
    }
}

impl RemoteFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
            status: None,
            retry_after_secs: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
            status: None,
            retry_after_secs: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

/// Verdict returned by the AI analysis service for one citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    /// Free-form feedback on factual accuracy and Bluebook compliance
    pub verdict: String,
    /// Model that produced the verdict
    pub model: String,
}

/// Structured case metadata returned by the case-law lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_name: Option<String>,
    pub court: Option<String>,
    pub date_filed: Option<chrono::NaiveDate>,
    pub docket_number: Option<String>,
    /// Parallel citations known to the service
    pub citations: Vec<String>,
    pub absolute_url: Option<String>,
}

/// Outcome of the analysis call for one citation.
pub type AnalysisResult = std::result::Result<AnalysisVerdict, RemoteFailure>;

/// Outcome of the lookup call for one citation. `Ok(None)` means the lookup
/// succeeded but no matching case record exists; that is information, not an
/// error.
pub type LookupResult = std::result::Result<Option<CaseRecord>, RemoteFailure>;

/// The join of one citation with both of its enrichment outcomes. Always
/// carries exactly one analysis result and one lookup result, success or
/// failure, so citation count is conserved end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedCitation {
    pub citation: ExtractedCitation,
    pub analysis: AnalysisResult,
    pub lookup: LookupResult,
}

impl EnrichedCitation {
    /// Whether the analysis side carries a failure marker.
    pub fn analysis_failed(&self) -> bool {
        self.analysis.is_err()
    }

    /// Whether the lookup side carries a failure marker. A not-found lookup
    /// is a success and returns false here.
    pub fn lookup_failed(&self) -> bool {
        self.lookup.is_err()
    }
}
