//! # Citation Extraction Module
//!
//! ## Purpose
//! The Citation Source boundary: turns raw legal text (or text derived from a
//! PDF by an external conversion step) into an ordered sequence of citation
//! records with stable positions.
//!
//! ## Input/Output Specification
//! - **Input**: Raw text, extraction options
//! - **Output**: Ordered `ExtractedCitation` list with components and context
//! - **Guarantee**: Pure and infallible at the run level; malformed or empty
//!   input yields an empty sequence, never an aborted run
//!
//! ## Key Features
//! - Text cleaning before matching: HTML markup stripped, whitespace
//!   collapsed, underscore runs removed, Unicode NFC normalization
//! - Case citations with and without party names, plus U.S.C. statute cites
//! - Component capture (parties, volume, reporter, page, year)
//! - Signal-word stripping, overlap suppression, duplicate removal
//! - Context window capture for the downstream analysis prompt

use crate::config::ExtractionConfig;
use crate::errors::{CiteError, Result};
use crate::ExtractedCitation;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// A party name: a capitalized token chain with a few lowercase connectors
/// ("Board of Education", "Nationwide Mut. Ins. Co.")
const PARTY: &str =
    r"[A-Z][A-Za-z0-9.'&\-]*(?:\s+(?:[A-Z][A-Za-z0-9.'&\-]*|of|the|and|for|ex|rel\.))*";

/// Introductory signals that the party pattern can absorb; stripped from the
/// captured case name
const SIGNALS: &[&str] = &["See also", "See", "Accord", "Contra", "Compare", "Cf.", "E.g.,"];

/// Citation extractor backed by a fixed pattern table
pub struct CitationExtractor {
    config: ExtractionConfig,
    patterns: Vec<CitationPattern>,
    html_regex: Regex,
    underscore_regex: Regex,
    whitespace_regex: Regex,
}

/// One compiled pattern plus how to read its captures
struct CitationPattern {
    regex: Regex,
    has_case_name: bool,
    has_year: bool,
}

impl CitationExtractor {
    /// Create a new extractor, compiling the pattern table
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        // Pattern order is priority order: party-name citations first so the
        // bare reporter pattern cannot claim their inner span.
        let case_with_parties = format!(
            r"(?P<case>{party}\s+v\.?\s+{party}),\s*(?P<volume>\d{{1,4}})\s+(?P<reporter>[A-Z][A-Za-z0-9. ]{{0,18}}?)\s+(?P<page>\d{{1,5}})(?:,\s*\d{{1,5}}(?:[-–]\d{{1,5}})?)?\s*\((?P<court>[^)]{{0,60}}?)\s*(?P<year>\d{{4}})\)",
            party = PARTY
        );
        let bare_reporter = r"(?P<volume>\d{1,4})\s+(?P<reporter>U\.S\.|S\.\s?Ct\.|L\.\s?Ed\.(?:\s?2d)?|F\.(?:\s?Supp\.)?(?:\s?[23]d)?|[A-Z][a-z]+\.(?:\s?[23]d)?)\s+(?P<page>\d{1,5})(?:,\s*\d{1,5}(?:[-–]\d{1,5})?)?\s*\((?P<court>[^)]{0,60}?)\s*(?P<year>\d{4})\)"
            .to_string();
        let statute =
            r"(?P<volume>\d{1,3})\s+(?P<reporter>U\.S\.C\.)\s+§{1,2}\s*(?P<page>[0-9][0-9A-Za-z\-()]*(?:\.[0-9A-Za-z\-()]+)*)"
                .to_string();

        let tables = [
            (case_with_parties, true, true),
            (bare_reporter, false, true),
            (statute, false, false),
        ];

        let mut patterns = Vec::new();
        for (pattern, has_case_name, has_year) in tables {
            patterns.push(CitationPattern {
                regex: Regex::new(&pattern).map_err(|e| CiteError::Internal {
                    message: format!("Invalid citation regex: {}", e),
                })?,
                has_case_name,
                has_year,
            });
        }

        Ok(Self {
            config,
            patterns,
            html_regex: Regex::new(r"<[^>]+>").map_err(|e| CiteError::Internal {
                message: format!("Invalid cleanup regex: {}", e),
            })?,
            underscore_regex: Regex::new(r"__+").map_err(|e| CiteError::Internal {
                message: format!("Invalid cleanup regex: {}", e),
            })?,
            whitespace_regex: Regex::new(r"\s+").map_err(|e| CiteError::Internal {
                message: format!("Invalid cleanup regex: {}", e),
            })?,
        })
    }

    /// Extract citations from text. Returns an empty sequence for empty or
    /// unparseable input; the run is never aborted from here.
    pub fn extract(&self, text: &str) -> Vec<ExtractedCitation> {
        if text.trim().is_empty() {
            tracing::warn!("Empty text provided to citation extractor");
            return Vec::new();
        }

        let cleaned = self.clean_text(text);
        let mut found: Vec<(std::ops::Range<usize>, ExtractedCitation)> = Vec::new();

        for pattern in &self.patterns {
            for captures in pattern.regex.captures_iter(&cleaned) {
                let full = match captures.get(0) {
                    Some(m) => m,
                    None => continue,
                };
                let mut span = full.range();

                let case_name = if pattern.has_case_name {
                    captures.name("case").map(|m| {
                        let raw = m.as_str();
                        let stripped = strip_signal_prefix(raw);
                        // The match begins with the case capture; dropping a
                        // signal prefix shifts the span start with it
                        span.start += raw.len() - stripped.len();
                        stripped.to_string()
                    })
                } else {
                    None
                };

                // Higher-priority patterns already claimed this span
                if found
                    .iter()
                    .any(|(taken, _)| span.start < taken.end && taken.start < span.end)
                {
                    continue;
                }

                let matched_text = cleaned[span.clone()].to_string();
                let citation = ExtractedCitation {
                    index: 0, // assigned after sorting
                    normalized: Self::normalize_citation(&matched_text),
                    text: matched_text,
                    case_name,
                    volume: captures.name("volume").map(|m| m.as_str().to_string()),
                    reporter: captures
                        .name("reporter")
                        .map(|m| m.as_str().trim().to_string()),
                    page: captures.name("page").map(|m| m.as_str().to_string()),
                    year: if pattern.has_year {
                        captures.name("year").and_then(|m| m.as_str().parse().ok())
                    } else {
                        None
                    },
                    position: span.start,
                    context: Some(self.context_window(&cleaned, span.start, span.end)),
                };
                found.push((span, citation));
            }
        }

        found.sort_by_key(|(span, _)| span.start);

        let mut citations: Vec<ExtractedCitation> = found.into_iter().map(|(_, c)| c).collect();

        if self.config.dedupe {
            let mut seen = std::collections::HashSet::new();
            citations.retain(|c| seen.insert(c.normalized.clone()));
        }

        for (index, citation) in citations.iter_mut().enumerate() {
            citation.index = index;
        }

        tracing::debug!("Extracted {} citations from text", citations.len());
        citations
    }

    /// Clean text before matching: strip HTML markup, remove underscore runs,
    /// collapse whitespace, NFC-normalize
    fn clean_text(&self, text: &str) -> String {
        let normalized: String = text.nfc().collect();
        let no_html = self.html_regex.replace_all(&normalized, " ");
        let no_underscores = self.underscore_regex.replace_all(&no_html, " ");
        let collapsed = self.whitespace_regex.replace_all(&no_underscores, " ");
        collapsed.trim().to_string()
    }

    /// Capture a character window around the match for the analysis prompt
    fn context_window(&self, text: &str, start: usize, end: usize) -> String {
        let window = self.config.context_window_chars;
        let before: String = {
            let chars: Vec<char> = text[..start].chars().rev().take(window).collect();
            chars.into_iter().rev().collect()
        };
        let after: String = text[end..].chars().take(window).collect();
        format!("{}{}{}", before, &text[start..end], after)
    }

    /// Normalize citation text for stable comparison
    fn normalize_citation(citation: &str) -> String {
        citation
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace(" ,", ",")
    }
}

/// Strip introductory signal words the party pattern may have absorbed
fn strip_signal_prefix(name: &str) -> &str {
    let mut rest = name;
    loop {
        let mut stripped = false;
        for signal in SIGNALS {
            if let Some(tail) = rest.strip_prefix(signal) {
                if tail.starts_with(' ') {
                    rest = tail.trim_start();
                    stripped = true;
                    break;
                }
            }
        }
        if !stripped {
            break;
        }
    }
    rest
}
