//! # AI Analysis Client
//!
//! ## Purpose
//! Wraps a single call to the AI analysis service for one citation: a
//! chat-completions request carrying a fixed fact-checking instruction and
//! the citation text, returning free-form verdict text.
//!
//! ## Input/Output Specification
//! - **Input**: One extracted citation (with optional surrounding context)
//! - **Output**: `AnalysisVerdict` on success, `RemoteFailure` marker otherwise
//! - **Auth**: Bearer token, supplied via configuration or `OPENAI_API_KEY`
//!
//! ## Key Features
//! - Mandatory request timeout; the call can never block indefinitely
//! - Retry-After honored on rate-limit responses
//! - Bounded retry with exponential backoff for transient failures
//! - Request-rate ceiling shared across concurrent callers

use crate::clients::{
    classify_status, failure_from_transport, retry_with_backoff, AnalysisProvider, RateLimiter,
};
use crate::config::{AnalysisConfig, RetryConfig};
use crate::errors::{CiteError, Result};
use crate::utils::TextUtils;
use crate::{AnalysisResult, AnalysisVerdict, ExtractedCitation, RemoteFailure};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Instruction sent with every analysis request. Checks factual accuracy and
/// 21st-edition Bluebook compliance, and asks the model to admit uncertainty.
const SYSTEM_PROMPT: &str = "You are a helpful, fact-checking, legal assistant. \
    Your task is to check the provided legal citations for factual accuracy \
    (e.g., does the citation contain the correct year of case, the correct \
    court, parties, reporter, volume, pages, etc.) and for 21st edition Legal \
    Bluebook compliance. If you do not know the correct information, tell the \
    user you are not sure.";

/// AI analysis service client
#[derive(Debug)]
pub struct AnalysisClient {
    http: Client,
    api_url: String,
    model: String,
    retry: RetryConfig,
    rate_limiter: RateLimiter,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl AnalysisClient {
    /// Create a new analysis client from configuration
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(CiteError::Config {
                message: "Analysis API key is required".to_string(),
            });
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth: reqwest::header::HeaderValue =
            format!("Bearer {}", config.api_key)
                .parse()
                .map_err(|_| CiteError::Config {
                    message: "Analysis API key contains invalid header characters".to_string(),
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
            model: config.model.clone(),
            retry: config.retry.clone(),
            rate_limiter: RateLimiter::new(config.rate_limit_rpm),
        })
    }

    /// One request attempt; classification into transient/permanent happens
    /// here, retrying is the caller's concern
    async fn attempt(&self, citation: &ExtractedCitation) -> AnalysisResult {
        self.rate_limiter.acquire().await;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_content(citation),
                },
            ],
        };

        let url = format!("{}/chat/completions", self.api_url);
        tracing::debug!(citation = %citation.normalized, "requesting analysis verdict");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| failure_from_transport("analysis", e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let mut failure =
                RemoteFailure::transient("Analysis service rate limited the request")
                    .with_status(status.as_u16());
            failure.retry_after_secs = retry_after;
            return Err(failure);
        }

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RemoteFailure {
                kind: classify_status(status.as_u16()),
                message: format!(
                    "Analysis service returned {}: {}",
                    status,
                    TextUtils::truncate(&body_text, 200)
                ),
                status: Some(status.as_u16()),
                retry_after_secs: None,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| failure_from_transport("analysis", e))?;

        let verdict = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if verdict.trim().is_empty() {
            return Err(RemoteFailure::transient(
                "Analysis service returned an empty verdict",
            ));
        }

        Ok(AnalysisVerdict {
            verdict,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[async_trait]
impl AnalysisProvider for AnalysisClient {
    fn name(&self) -> &str {
        "analysis"
    }

    async fn analyze(&self, citation: &ExtractedCitation) -> AnalysisResult {
        retry_with_backoff(&self.retry, "analysis", || self.attempt(citation)).await
    }
}

/// Compose the user message: the citation itself, plus the surrounding text
/// window when extraction captured one
fn user_content(citation: &ExtractedCitation) -> String {
    match citation.context.as_deref() {
        Some(context) if !context.trim().is_empty() => {
            format!(
                "Citation: {}\n\nSurrounding text:\n{}",
                citation.text, context
            )
        }
        _ => citation.text.clone(),
    }
}
