//! # Case-Law Lookup Client
//!
//! ## Purpose
//! Wraps a single call to the case-law lookup service for one citation,
//! fetching authoritative case metadata from a CourtListener-shaped search
//! API.
//!
//! ## Input/Output Specification
//! - **Input**: One extracted citation
//! - **Output**: `Ok(Some(CaseRecord))` on a hit, `Ok(None)` when no matching
//!   case record exists, `RemoteFailure` marker on transport or service failure
//! - **Auth**: Token header, supplied via configuration or `COURT_LISTENER_TOKEN`
//!
//! ## Key Features
//! - Not-found is a success outcome: "no record" is valid information
//! - Mandatory request timeout, Retry-After honored on rate limiting
//! - Bounded retry with exponential backoff for transient failures
//! - Request-rate ceiling shared across concurrent callers

use crate::clients::{
    classify_status, failure_from_transport, retry_with_backoff, CaseLookupProvider, RateLimiter,
};
use crate::config::{LookupConfig, RetryConfig};
use crate::errors::{CiteError, Result};
use crate::utils::TextUtils;
use crate::{CaseRecord, ExtractedCitation, LookupResult, RemoteFailure};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Case-law lookup service client
#[derive(Debug)]
pub struct LookupClient {
    http: Client,
    api_url: String,
    retry: RetryConfig,
    rate_limiter: RateLimiter,
}

/// Search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One opinion search hit
#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "caseName", default)]
    case_name: Option<String>,
    #[serde(default)]
    court: Option<String>,
    #[serde(rename = "dateFiled", default)]
    date_filed: Option<String>,
    #[serde(rename = "docketNumber", default)]
    docket_number: Option<String>,
    #[serde(default)]
    citation: Option<Vec<String>>,
    #[serde(default)]
    absolute_url: Option<String>,
}

impl LookupClient {
    /// Create a new lookup client from configuration
    pub fn new(config: &LookupConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(CiteError::Config {
                message: "Lookup API token is required".to_string(),
            });
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth: reqwest::header::HeaderValue =
            format!("Token {}", config.api_token)
                .parse()
                .map_err(|_| CiteError::Config {
                    message: "Lookup API token contains invalid header characters".to_string(),
                })?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .user_agent("citation-pipeline/0.1")
            .build()
            .map_err(|e| CiteError::NetworkError {
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
            rate_limiter: RateLimiter::new(config.rate_limit_rpm),
        })
    }

    /// One request attempt against the opinion search endpoint
    async fn attempt(&self, citation: &ExtractedCitation) -> LookupResult {
        self.rate_limiter.acquire().await;

        let url = format!("{}/search/", self.api_url);
        tracing::debug!(citation = %citation.normalized, "requesting case record");

        let response = self
            .http
            .get(&url)
            .query(&[("type", "o"), ("q", citation.normalized.as_str())])
            .send()
            .await
            .map_err(|e| failure_from_transport("lookup", e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let mut failure = RemoteFailure::transient("Lookup service rate limited the request")
                .with_status(status.as_u16());
            failure.retry_after_secs = retry_after;
            return Err(failure);
        }

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RemoteFailure {
                kind: classify_status(status.as_u16()),
                message: format!(
                    "Lookup service returned {}: {}",
                    status,
                    TextUtils::truncate(&body_text, 200)
                ),
                status: Some(status.as_u16()),
                retry_after_secs: None,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| failure_from_transport("lookup", e))?;

        // A zero-hit search is a valid answer, keyed off the hit count and
        // never off HTTP status
        match parsed.results.into_iter().next() {
            Some(hit) if parsed.count > 0 => Ok(Some(convert_hit(hit))),
            _ => {
                tracing::debug!(citation = %citation.normalized, "no matching case record");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CaseLookupProvider for LookupClient {
    fn name(&self) -> &str {
        "lookup"
    }

    async fn lookup(&self, citation: &ExtractedCitation) -> LookupResult {
        retry_with_backoff(&self.retry, "lookup", || self.attempt(citation)).await
    }
}

/// Convert a search hit into the pipeline's case record
fn convert_hit(hit: SearchHit) -> CaseRecord {
    CaseRecord {
        case_name: hit.case_name.filter(|s| !s.trim().is_empty()),
        court: hit.court.filter(|s| !s.trim().is_empty()),
        date_filed: hit.date_filed.as_deref().and_then(parse_date_filed),
        docket_number: hit.docket_number.filter(|s| !s.trim().is_empty()),
        citations: hit.citation.unwrap_or_default(),
        absolute_url: hit.absolute_url.filter(|s| !s.trim().is_empty()),
    }
}

/// The service answers with a date or a full timestamp depending on the
/// record; only the date part is meaningful here
fn parse_date_filed(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}
