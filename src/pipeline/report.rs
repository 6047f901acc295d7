//! # Result Aggregator
//!
//! ## Purpose
//! Collects per-citation records as batches complete and assembles them into
//! one ordered `BatchReport` with failure counts.
//!
//! ## Input/Output Specification
//! - **Input**: `EnrichedCitation` values in batch-completion order
//! - **Output**: A finalized `BatchReport`, ordered by original citation
//!   index, never mutated after return
//! - **Invariant**: Every input citation maps to exactly one entry, for any
//!   mix of successes and failures

use crate::EnrichedCitation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final report for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per input citation, in original extraction order
    pub entries: Vec<EnrichedCitation>,
    /// Entries whose analysis call carries a failure marker
    pub analysis_failures: usize,
    /// Entries whose lookup call carries a failure marker; lookup misses are
    /// successes and never counted here
    pub lookup_failures: usize,
}

impl BatchReport {
    /// Number of citations in the report
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Combined failure count across both services
    pub fn failure_total(&self) -> usize {
        self.analysis_failures + self.lookup_failures
    }

    /// Whether every remote call in the run succeeded
    pub fn is_clean(&self) -> bool {
        self.failure_total() == 0
    }
}

/// Accumulates batch outputs and finalizes the ordered report
pub struct ReportBuilder {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    expected: usize,
    entries: Vec<EnrichedCitation>,
}

impl ReportBuilder {
    /// Start a report for a run expected to produce `expected` entries
    pub fn new(expected: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            expected,
            entries: Vec::with_capacity(expected),
        }
    }

    /// Record one completed batch
    pub fn push_batch(&mut self, batch: Vec<EnrichedCitation>) {
        self.entries.extend(batch);
    }

    /// Finalize: restore original citation order and compute failure counts
    pub fn finish(mut self) -> BatchReport {
        self.entries.sort_by_key(|entry| entry.citation.index);

        if self.entries.len() != self.expected {
            tracing::error!(
                expected = self.expected,
                actual = self.entries.len(),
                "citation count mismatch in final report"
            );
        }

        let analysis_failures = self.entries.iter().filter(|e| e.analysis_failed()).count();
        let lookup_failures = self.entries.iter().filter(|e| e.lookup_failed()).count();

        BatchReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            entries: self.entries,
            analysis_failures,
            lookup_failures,
        }
    }
}
