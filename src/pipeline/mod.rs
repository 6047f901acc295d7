//! # Enrichment Pipeline Module
//!
//! ## Purpose
//! Orchestrates the complete citation enrichment workflow: extraction, batch
//! scheduling, bounded-concurrency two-source enrichment, and ordered result
//! aggregation.
//!
//! ## Input/Output Specification
//! - **Input**: Raw text (or a pre-extracted citation sequence)
//! - **Output**: A `BatchReport` with one entry per citation, in original order
//! - **Workflow**: Extract → Batch → Enrich (two concurrent calls per citation)
//!   → Aggregate
//!
//! ## Key Features
//! - Global concurrency ceiling: at most C citation units in flight, each
//!   unit holding one admission permit across both of its remote calls
//! - Sequential batch launches for incremental progress reporting; citations
//!   within a batch run concurrently
//! - Failure isolation: per-citation failures are recorded as data and never
//!   abort the batch or the run
//! - Cooperative abort with a drain policy: the in-flight batch completes,
//!   unstarted citations are recorded with failure markers, and the partial
//!   report still enumerates every input citation
//!
//! ## Architecture
//! - `batch.rs`: batch scheduler
//! - `enrich.rs`: per-citation two-source join
//! - `report.rs`: ordered aggregation and failure accounting

pub mod batch;
pub mod enrich;
pub mod report;

use crate::clients::{AnalysisProvider, CaseLookupProvider};
use crate::config::Config;
use crate::errors::{CiteError, Result};
use crate::extraction::CitationExtractor;
use crate::utils::Timer;
use crate::{EnrichedCitation, ExtractedCitation, RemoteFailure};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub use batch::{Batch, BatchScheduler, Batches};
pub use enrich::EnrichmentCoordinator;
pub use report::{BatchReport, ReportBuilder};

/// Main enrichment pipeline
pub struct CitationPipeline {
    config: Config,
    extractor: CitationExtractor,
    coordinator: EnrichmentCoordinator,
    admission: Arc<Semaphore>,
}

impl CitationPipeline {
    /// Create a new pipeline over the given providers. Only the pipeline
    /// knobs are validated here; credential checks belong to the concrete
    /// clients.
    pub fn new(
        config: Config,
        analysis: Arc<dyn AnalysisProvider>,
        lookup: Arc<dyn CaseLookupProvider>,
    ) -> Result<Self> {
        if config.pipeline.batch_size == 0 {
            return Err(CiteError::ValidationFailed {
                field: "pipeline.batch_size".to_string(),
                reason: "Batch size must be greater than zero".to_string(),
            });
        }
        if config.pipeline.max_concurrent_citations == 0 {
            return Err(CiteError::ValidationFailed {
                field: "pipeline.max_concurrent_citations".to_string(),
                reason: "Concurrency limit must be greater than zero".to_string(),
            });
        }

        let extractor = CitationExtractor::new(config.extraction.clone())?;
        let admission = Arc::new(Semaphore::new(config.pipeline.max_concurrent_citations));

        Ok(Self {
            config,
            extractor,
            coordinator: EnrichmentCoordinator::new(analysis, lookup),
            admission,
        })
    }

    /// Extract citations from text and enrich them all
    pub async fn check_text(&self, text: &str) -> BatchReport {
        self.check_text_with_cancel(text, &CancellationToken::new())
            .await
    }

    /// Extract and enrich with cooperative abort support
    pub async fn check_text_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let citations = self.extractor.extract(text);
        self.process_with_cancel(citations, cancel).await
    }

    /// Enrich an already-extracted citation sequence
    pub async fn process(&self, citations: Vec<ExtractedCitation>) -> BatchReport {
        self.process_with_cancel(citations, &CancellationToken::new())
            .await
    }

    /// Enrich an already-extracted citation sequence with abort support.
    ///
    /// Cancellation is observed at batch boundaries: the in-flight batch
    /// drains, and every unstarted citation is recorded with transient
    /// failure markers so the partial report still conserves citation count.
    pub async fn process_with_cancel(
        &self,
        citations: Vec<ExtractedCitation>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let timer = Timer::new("citation-run");
        let total = citations.len();
        let mut builder = ReportBuilder::new(total);

        if total == 0 {
            tracing::info!("No citations to process");
            return builder.finish();
        }

        let scheduler = BatchScheduler::new(self.config.pipeline.batch_size);
        tracing::info!(
            "Processing {} citations in {} batches of size {} (concurrency limit {})",
            total,
            scheduler.total_batches(total),
            self.config.pipeline.batch_size,
            self.config.pipeline.max_concurrent_citations
        );

        for batch in scheduler.partition(citations) {
            if cancel.is_cancelled() {
                tracing::warn!(
                    batch_id = batch.id,
                    skipped = batch.citations.len(),
                    "run aborted, recording unstarted citations"
                );
                builder.push_batch(
                    batch
                        .citations
                        .into_iter()
                        .map(aborted_entry)
                        .collect(),
                );
                continue;
            }

            let batch_id = batch.id;
            let batch_len = batch.citations.len();
            let futures: Vec<_> = batch
                .citations
                .into_iter()
                .map(|citation| {
                    let admission = Arc::clone(&self.admission);
                    let coordinator = self.coordinator.clone();
                    async move {
                        // One permit spans both remote calls of this citation
                        match admission.acquire_owned().await {
                            Ok(_permit) => coordinator.enrich(citation).await,
                            Err(_) => aborted_entry(citation),
                        }
                    }
                })
                .collect();

            let entries = futures::future::join_all(futures).await;
            tracing::debug!(batch_id, batch_len, "batch completed");
            builder.push_batch(entries);
        }

        let report = builder.finish();
        let elapsed_ms = timer.stop();
        tracing::info!(
            "Run {} completed: {} citations, {} analysis failures, {} lookup failures in {}ms",
            report.run_id,
            report.total(),
            report.analysis_failures,
            report.lookup_failures,
            elapsed_ms
        );
        report
    }
}

/// Entry recorded for a citation whose processing never started
fn aborted_entry(citation: ExtractedCitation) -> EnrichedCitation {
    let marker = || RemoteFailure::transient("run aborted before processing");
    EnrichedCitation {
        citation,
        analysis: Err(marker()),
        lookup: Err(marker()),
    }
}
