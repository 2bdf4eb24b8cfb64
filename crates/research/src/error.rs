//! Error types for the research crate.
//!
//! Only [`ResearchError::Config`] and [`ResearchError::Task`] are fatal to a
//! run. Everything raised inside an iteration is logged and degraded by the
//! pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResearchError {
    /// Missing credentials or invalid run options.
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// The research request could not be understood.
    #[error("Invalid research task: {reason}")]
    Task { reason: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Content extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("AI error: {0}")]
    Ai(#[from] llm::LlmError),

    /// Malformed structured output from a model.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    #[error("Source already registered: {url}")]
    DuplicateSource { url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

impl ResearchError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}

impl From<handlebars::TemplateError> for ResearchError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Parse {
            reason: format!("prompt template: {err}"),
        }
    }
}

/// Result alias for research operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResearchError::config("missing google_api_key");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing google_api_key"
        );

        let err = ResearchError::Extraction {
            url: "https://example.com".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Content extraction failed for https://example.com: timeout"
        );
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: ResearchError = llm::LlmError::Request("reset".to_string()).into();
        assert!(matches!(err, ResearchError::Ai(_)));
        assert!(err.to_string().contains("reset"));
    }
}
