//! # Remote Service Clients Module
//!
//! ## Purpose
//! Defines the common interface for the two enrichment services and provides
//! the HTTP client implementations: the AI analysis service and the case-law
//! lookup service.
//!
//! ## Input/Output Specification
//! - **Input**: One extracted citation per call, API credentials, timeouts
//! - **Output**: A verdict or case record on success; a `RemoteFailure` marker
//!   on failure — never a run-level error
//! - **Services**: AI analysis (OpenAI-shaped), case lookup (CourtListener-shaped)
//!
//! ## Key Features
//! - Unified trait seam so the pipeline can run against stub providers
//! - Request-rate ceiling shared across concurrent callers
//! - Bounded retry with exponential backoff for transient failures only
//! - Transient/permanent classification of transport and status failures
//!
//! ## Architecture
//! - `AnalysisProvider` / `CaseLookupProvider` traits: the pipeline seam
//! - `analysis.rs`: AI analysis client implementation
//! - `lookup.rs`: case-law lookup client implementation

pub mod analysis;
pub mod lookup;

use crate::config::RetryConfig;
use crate::{AnalysisResult, ExtractedCitation, FailureKind, LookupResult, RemoteFailure};
use async_trait::async_trait;
use tokio::time::{sleep, Duration, Instant};

pub use analysis::AnalysisClient;
pub use lookup::LookupClient;

/// Trait for the AI analysis service: one call per citation, returning a
/// verdict or a failure marker.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Service name used in logs and failure messages
    fn name(&self) -> &str;

    /// Judge one citation for factual accuracy and Bluebook compliance
    async fn analyze(&self, citation: &ExtractedCitation) -> AnalysisResult;
}

/// Trait for the case-law lookup service: one call per citation, returning
/// case metadata, a not-found success, or a failure marker.
#[async_trait]
pub trait CaseLookupProvider: Send + Sync {
    /// Service name used in logs and failure messages
    fn name(&self) -> &str;

    /// Fetch authoritative metadata for one citation
    async fn lookup(&self, citation: &ExtractedCitation) -> LookupResult;
}

/// Minimum-interval rate limiter shared across concurrent callers of one
/// client. Holding the lock across the sleep is what serializes callers onto
/// the configured ceiling.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for the given requests-per-minute ceiling; 0 disables
    /// limiting
    pub fn new(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / requests_per_minute
        };
        Self {
            min_interval,
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    /// Wait until the next request slot is available
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Classify an HTTP status into a failure kind: rate limiting and server
/// errors are retryable, other client errors mean the request itself was
/// rejected.
pub(crate) fn classify_status(status: u16) -> FailureKind {
    if status == 429 || status >= 500 {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

/// Convert a transport-level error into a failure marker. Timeouts, connect
/// failures, and malformed bodies are all transient: the request never
/// reached a service that could reject it.
pub(crate) fn failure_from_transport(service: &str, err: reqwest::Error) -> RemoteFailure {
    RemoteFailure::transient(format!("{} request failed: {}", service, err))
}

/// Run `attempt` up to `1 + max_retries` times, sleeping with exponential
/// backoff between attempts. Only transient failures are retried; a
/// server-provided Retry-After extends the backoff.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryConfig,
    service: &str,
    mut attempt_fn: F,
) -> std::result::Result<T, RemoteFailure>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, RemoteFailure>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut delay = Duration::from_millis(policy.initial_backoff_ms);

    for attempt in 0..max_attempts {
        if attempt > 0 {
            tracing::debug!(service, attempt, "retrying after {:?}", delay);
            sleep(delay).await;
            delay = delay.saturating_mul(2);
        }

        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.is_transient() && attempt + 1 < max_attempts => {
                if let Some(retry_after) = failure.retry_after_secs {
                    delay = delay.max(Duration::from_secs(retry_after));
                }
                tracing::warn!(
                    service,
                    attempt,
                    error = %failure.message,
                    "transient remote failure"
                );
            }
            Err(failure) => return Err(failure),
        }
    }

    // Unreachable: the last attempt always returns above
    Err(RemoteFailure::transient(format!(
        "{} retry budget exhausted",
        service
    )))
}
