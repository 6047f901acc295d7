//! # Utilities Module
//!
//! ## Purpose
//! Common helpers used throughout the citation pipeline for performance
//! logging and log-safe text handling.
//!
//! ## Input/Output Specification
//! - **Input**: Operation names, arbitrary text
//! - **Output**: Elapsed-time measurements, bounded text excerpts
//! - **Functions**: Timer, text truncation and preview helpers

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

/// Text processing utilities
pub struct TextUtils;

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

impl TextUtils {
    /// Truncate text to specified length with ellipsis, keeping char
    /// boundaries intact
    pub fn truncate(text: &str, max_length: usize) -> String {
        if text.chars().count() <= max_length {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }

    /// Extract preview text from longer content
    pub fn preview(text: &str, max_words: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().take(max_words).collect();
        let preview = words.join(" ");

        if words.len() >= max_words {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}
