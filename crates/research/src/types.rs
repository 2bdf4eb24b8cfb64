//! Core research data types: queries, search hits and sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest and highest query importance.
pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 5;

/// A search to run, ranked by importance (5 = most important).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text sent to the search engine.
    #[serde(rename = "query")]
    pub text: String,
    /// Priority from 1 to 5.
    #[serde(default = "default_importance")]
    pub importance: u8,
    /// Optional scope qualifier such as `site:example.com`.
    #[serde(
        rename = "site_restrict",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub site_restriction: Option<String>,
}

fn default_importance() -> u8 {
    MIN_IMPORTANCE
}

impl SearchQuery {
    /// Create a query, clamping importance into 1..=5.
    pub fn new(text: impl Into<String>, importance: u8) -> Self {
        Self {
            text: text.into(),
            importance: importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE),
            site_restriction: None,
        }
    }

    /// Restrict the query to a site.
    #[must_use]
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        let site = site.into();
        self.site_restriction = if site.trim().is_empty() {
            None
        } else {
            Some(site)
        };
        self
    }

    /// Identity used for deduplication.
    pub fn key(&self) -> QueryKey {
        QueryKey {
            text: self.text.clone(),
            site_restriction: self.site_restriction.clone(),
        }
    }

    /// Text actually sent to the engine, with the site restriction appended.
    pub fn full_text(&self) -> String {
        match &self.site_restriction {
            Some(site) => format!("{} {}", self.text, site),
            None => self.text.clone(),
        }
    }
}

/// Deduplication key of a [`SearchQuery`]: `(text, site_restriction)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub text: String,
    pub site_restriction: Option<String>,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.site_restriction {
            Some(site) => write!(f, "{}:{}", self.text, site),
            None => write!(f, "{}:", self.text),
        }
    }
}

/// One organic result from a search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Kind of document a source was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Pdf,
    Error,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Error => "error",
        }
    }

    /// Parse a stored content type; unknown values map to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker carried by extraction diagnostics, e.g. `[PDF EXTRACTION ERROR: ...]`.
pub const EXTRACTION_ERROR_MARKER: &str = "EXTRACTION ERROR";

/// Text pulled from a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub text: String,
    pub content_type: ContentType,
}

impl ExtractedContent {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            content_type: ContentType::Html,
        }
    }

    pub fn pdf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            content_type: ContentType::Pdf,
        }
    }

    /// A failed extraction; `kind` prefixes the diagnostic, e.g. "CONTENT".
    pub fn error(kind: &str, reason: impl fmt::Display) -> Self {
        Self {
            text: format!("[{kind} {EXTRACTION_ERROR_MARKER}: {reason}]"),
            content_type: ContentType::Error,
        }
    }

    /// Error type, or a bracketed extraction diagnostic in place of content.
    pub fn is_error(&self) -> bool {
        self.content_type == ContentType::Error
            || (self.text.starts_with('[') && self.text.contains(EXTRACTION_ERROR_MARKER))
    }
}

/// Result of scoring a source against the research task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Relevance in [0.0, 1.0].
    pub score: f32,
    /// A few bullet points of key information.
    #[serde(default)]
    pub short_summary: String,
    /// Suggested topics for further research, one per line.
    #[serde(default)]
    pub research_topics: String,
}

impl Evaluation {
    /// Score used when the evaluator cannot produce one.
    pub const NEUTRAL_SCORE: f32 = 0.5;

    pub fn new(score: f32) -> Self {
        Self {
            score: clamp_score(score),
            short_summary: String::new(),
            research_topics: String::new(),
        }
    }

    /// Neutral fallback after an evaluator failure.
    pub fn neutral() -> Self {
        Self::new(Self::NEUTRAL_SCORE)
    }
}

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// A fetched, scored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub content: String,
    pub content_type: ContentType,
    pub relevance_score: f32,
    #[serde(default)]
    pub short_summary: String,
    #[serde(default)]
    pub research_topics: String,
}

impl Source {
    /// Build a source from a search hit, its extracted content and its score.
    pub fn from_parts(hit: SearchHit, content: ExtractedContent, evaluation: Evaluation) -> Self {
        Self {
            url: hit.url,
            title: hit.title,
            snippet: hit.snippet,
            content: content.text,
            content_type: content.content_type,
            relevance_score: clamp_score(evaluation.score),
            short_summary: evaluation.short_summary,
            research_topics: evaluation.research_topics,
        }
    }

    /// Individual topic lines with bullet markers removed.
    pub fn topic_lines(&self) -> impl Iterator<Item = &str> {
        self.research_topics
            .lines()
            .map(|line| line.trim().trim_start_matches(['•', '-', '*']).trim())
            .filter(|line| !line.is_empty())
    }
}
