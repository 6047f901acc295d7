//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the citation pipeline, supporting TOML files
//! and environment variables with validation and type-safe access to all
//! settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Credential presence, range checks on batch/concurrency knobs
//!
//! ## Key Features
//! - Environment-variable overrides using the service's established names
//!   (`OPENAI_API_KEY`, `COURT_LISTENER_TOKEN`, `BATCH_SIZE`, ...)
//! - Fail-fast validation: missing credentials or invalid parameters abort
//!   before any citation is processed
//! - Secure handling of API keys: supplied via config or environment only,
//!   never embedded in source
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)

use crate::errors::{CiteError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch and concurrency settings
    pub pipeline: PipelineConfig,
    /// AI analysis service settings
    pub analysis: AnalysisConfig,
    /// Case-law lookup service settings
    pub lookup: LookupConfig,
    /// Citation extraction settings
    pub extraction: ExtractionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Optional key for the adjacent federal-statute dataset; carried but
    /// never required
    pub congress_api_key: Option<String>,
}

/// Batch and concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Citations per batch (reporting granularity)
    pub batch_size: usize,
    /// Global ceiling on simultaneously in-flight citation units; each unit
    /// issues two concurrent remote calls but counts once
    pub max_concurrent_citations: usize,
}

/// AI analysis service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// API base URL
    pub api_url: String,
    /// Bearer token; from config or the OPENAI_API_KEY environment variable
    pub api_key: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Rate limit: requests per minute, shared across concurrent callers
    pub rate_limit_rpm: u32,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

/// Case-law lookup service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// API base URL
    pub api_url: String,
    /// Token; from config or the COURT_LISTENER_TOKEN environment variable
    pub api_token: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Rate limit: requests per minute, shared across concurrent callers
    pub rate_limit_rpm: u32,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the initial attempt; 0 disables retrying
    pub max_retries: u32,
    /// First backoff delay; doubles on each subsequent retry
    pub initial_backoff_ms: u64,
}

/// Citation extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Characters of surrounding text captured around each citation for the
    /// analysis prompt
    pub context_window_chars: usize,
    /// Drop repeat occurrences of the same normalized citation
    pub dedupe: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or tracing filter directive (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_concurrent_citations: 10,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4-1106-preview".to_string(),
            timeout_seconds: 30,
            rate_limit_rpm: 60,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.courtlistener.com/api/rest/v3".to_string(),
            api_token: String::new(),
            timeout_seconds: 30,
            rate_limit_rpm: 180,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window_chars: 240,
            dedupe: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| CiteError::Config {
                message: format!("Failed to read config file {:?}: {}", path, e),
            })?;
            toml::from_str(&content).map_err(|e| CiteError::Config {
                message: format!("Failed to parse config file {:?}: {}", path, e),
            })?
        } else {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.analysis.api_key = key;
        }
        if let Ok(token) = std::env::var("COURT_LISTENER_TOKEN") {
            self.lookup.api_token = token;
        }
        if let Ok(key) = std::env::var("CONGRESS_API_KEY") {
            self.congress_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("GPT4_MODEL") {
            self.analysis.model = model;
        }
        if let Ok(batch_size) = std::env::var("BATCH_SIZE") {
            self.pipeline.batch_size = batch_size.parse().map_err(|_| CiteError::Config {
                message: "Invalid number in BATCH_SIZE".to_string(),
            })?;
        }
        if let Ok(workers) = std::env::var("MAX_WORKERS") {
            self.pipeline.max_concurrent_citations =
                workers.parse().map_err(|_| CiteError::Config {
                    message: "Invalid number in MAX_WORKERS".to_string(),
                })?;
        }
        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT") {
            let timeout: u64 = timeout.parse().map_err(|_| CiteError::Config {
                message: "Invalid number in REQUEST_TIMEOUT".to_string(),
            })?;
            self.analysis.timeout_seconds = timeout;
            self.lookup.timeout_seconds = timeout;
        }
        if let Ok(retries) = std::env::var("MAX_RETRIES") {
            let retries: u32 = retries.parse().map_err(|_| CiteError::Config {
                message: "Invalid number in MAX_RETRIES".to_string(),
            })?;
            self.analysis.retry.max_retries = retries;
            self.lookup.retry.max_retries = retries;
        }

        Ok(())
    }

    /// Validate configuration values; any failure here aborts the run before
    /// processing begins
    pub fn validate(&self) -> Result<()> {
        if self.analysis.api_key.trim().is_empty() {
            return Err(CiteError::Config {
                message: "analysis.api_key (or OPENAI_API_KEY) is required".to_string(),
            });
        }
        if self.lookup.api_token.trim().is_empty() {
            return Err(CiteError::Config {
                message: "lookup.api_token (or COURT_LISTENER_TOKEN) is required".to_string(),
            });
        }
        if self.pipeline.batch_size == 0 {
            return Err(CiteError::ValidationFailed {
                field: "pipeline.batch_size".to_string(),
                reason: "Batch size must be greater than zero".to_string(),
            });
        }
        if self.pipeline.max_concurrent_citations == 0 {
            return Err(CiteError::ValidationFailed {
                field: "pipeline.max_concurrent_citations".to_string(),
                reason: "Concurrency limit must be greater than zero".to_string(),
            });
        }
        if self.analysis.timeout_seconds == 0 || self.lookup.timeout_seconds == 0 {
            return Err(CiteError::ValidationFailed {
                field: "timeout_seconds".to_string(),
                reason: "Request timeout must be greater than zero".to_string(),
            });
        }
        if self.analysis.retry.initial_backoff_ms == 0 || self.lookup.retry.initial_backoff_ms == 0
        {
            return Err(CiteError::ValidationFailed {
                field: "retry.initial_backoff_ms".to_string(),
                reason: "Initial backoff must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn populated() -> Config {
        let mut config = Config::default();
        config.analysis.api_key = "sk-test".to_string();
        config.lookup.api_token = "cl-test".to_string();
        config
    }

    #[test]
    fn test_defaults_match_original_knobs() {
        let config = Config::default();
        assert_eq!(config.pipeline.batch_size, 5);
        assert_eq!(config.pipeline.max_concurrent_citations, 10);
        assert_eq!(config.analysis.retry.max_retries, 2);
        assert_eq!(config.analysis.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "configuration");

        assert!(populated().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_knobs() {
        let mut config = populated();
        config.pipeline.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = populated();
        config.pipeline.max_concurrent_citations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[pipeline]\nbatch_size = 3\n\n[analysis]\napi_key = \"sk-file\"\n\n[lookup]\napi_token = \"cl-file\""
        )
        .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.pipeline.batch_size, 3);
        assert_eq!(config.pipeline.max_concurrent_citations, 10);
        assert_eq!(config.analysis.api_key, "sk-file");
        assert_eq!(config.lookup.api_token, "cl-file");
        assert!(config.congress_api_key.is_none());
    }
}
