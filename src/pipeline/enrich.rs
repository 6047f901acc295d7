//! # Enrichment Coordinator
//!
//! ## Purpose
//! Runs the two-source join for one citation: the analysis call and the
//! lookup call are issued concurrently, each side settles independently, and
//! the outcomes merge into one `EnrichedCitation`.
//!
//! ## Input/Output Specification
//! - **Input**: One extracted citation
//! - **Output**: One `EnrichedCitation` carrying exactly one analysis outcome
//!   and one lookup outcome, success or failure marker
//! - **Isolation**: A failure on one side never cancels or blocks the other;
//!   both sides failing is recorded, not fatal

use crate::clients::{AnalysisProvider, CaseLookupProvider};
use crate::{EnrichedCitation, ExtractedCitation};
use std::sync::Arc;

/// Joins the two remote calls for one citation
#[derive(Clone)]
pub struct EnrichmentCoordinator {
    analysis: Arc<dyn AnalysisProvider>,
    lookup: Arc<dyn CaseLookupProvider>,
}

impl EnrichmentCoordinator {
    pub fn new(analysis: Arc<dyn AnalysisProvider>, lookup: Arc<dyn CaseLookupProvider>) -> Self {
        Self { analysis, lookup }
    }

    /// Enrich one citation. Both calls start together and both settle before
    /// this returns; each outcome is captured independently.
    pub async fn enrich(&self, citation: ExtractedCitation) -> EnrichedCitation {
        let (analysis, lookup) = tokio::join!(
            self.analysis.analyze(&citation),
            self.lookup.lookup(&citation)
        );

        if let Err(failure) = &analysis {
            tracing::warn!(
                citation = %citation.normalized,
                kind = failure.kind.as_str(),
                "analysis call failed: {}",
                failure.message
            );
        }
        if let Err(failure) = &lookup {
            tracing::warn!(
                citation = %citation.normalized,
                kind = failure.kind.as_str(),
                "lookup call failed: {}",
                failure.message
            );
        }

        EnrichedCitation {
            citation,
            analysis,
            lookup,
        }
    }
}
