//! Error types for LLM provider calls.

use thiserror::Error;

/// Errors raised while talking to an LLM provider.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("provider not configured: {env_var} is not set")]
    NotConfigured { env_var: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("response parse error: {reason}")]
    ResponseParse { reason: String },

    #[error("empty response from model {model}")]
    EmptyResponse { model: String },
}

/// Result alias for provider operations.
pub type LlmResult<T> = Result<T, LlmError>;
