//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the citation pipeline, providing structured
//! error types for configuration, extraction, and remote-service failures.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from configuration loading, extraction, and HTTP clients
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Configuration, Extraction, Remote, Internal
//!
//! ## Key Features
//! - Hierarchical error types with detailed context
//! - Automatic conversion from common library errors
//! - Distinction between fatal (configuration) and recoverable (remote) failures
//! - Structured logging integration
//!
//! Per-citation remote failures are deliberately NOT represented here: they
//! travel as [`crate::RemoteFailure`] markers inside the report data, never as
//! run-level errors.

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, CiteError>;

/// Error types for the citation pipeline
#[derive(Debug, Error)]
pub enum CiteError {
    /// Missing credentials or invalid parameters; fatal at startup
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation of a configuration field failed
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// The citation extractor could not process its input
    #[error("Citation extraction failed: {details}")]
    Extraction { details: String },

    /// Network-related errors outside the per-citation marker path
    #[error("Network error: {details}")]
    NetworkError { details: String },

    /// Rate limiting reported by a remote service
    #[error("Rate limit exceeded for {service}")]
    RateLimitExceeded {
        service: String,
        retry_after_seconds: Option<u64>,
    },

    /// Data from a remote service could not be parsed
    #[error("Failed to parse data from {service}: {details}")]
    DataParsing { service: String, details: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violations
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CiteError {
    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CiteError::NetworkError { .. }
                | CiteError::RateLimitExceeded { .. }
                | CiteError::Http(_)
        )
    }

    /// Check if the error must abort the run before processing begins
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CiteError::Config { .. } | CiteError::ValidationFailed { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            CiteError::Config { .. } | CiteError::ValidationFailed { .. } => "configuration",
            CiteError::Extraction { .. } => "extraction",
            CiteError::NetworkError { .. }
            | CiteError::RateLimitExceeded { .. }
            | CiteError::DataParsing { .. }
            | CiteError::Http(_) => "remote",
            CiteError::Json(_) | CiteError::Toml(_) | CiteError::Io(_) => "serialization",
            CiteError::Internal { .. } => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = CiteError::Config {
            message: "OPENAI_API_KEY is required".to_string(),
        };
        assert_eq!(err.category(), "configuration");
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());

        let err = CiteError::NetworkError {
            details: "connection reset".to_string(),
        };
        assert_eq!(err.category(), "remote");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());

        let err = CiteError::Extraction {
            details: "input is not text".to_string(),
        };
        assert_eq!(err.category(), "extraction");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let err = CiteError::RateLimitExceeded {
            service: "courtlistener".to_string(),
            retry_after_seconds: Some(60),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("courtlistener"));
    }
}
