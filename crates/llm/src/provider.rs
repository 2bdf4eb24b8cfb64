//! Provider trait and message types.
//!
//! Every backend the research pipeline talks to implements [`LlmProvider`].
//! Callers build a short conversation of [`Message`]s and get back a
//! [`Completion`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Text produced by a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    /// Model that actually served the request.
    pub model: String,
}

/// Sampling options for a single call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Sampling temperature (0.0 to 1.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
}

impl CompletionOptions {
    /// Options with a fixed temperature and token budget.
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            stop_sequences: None,
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, e.g. "anthropic".
    fn name(&self) -> &'static str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    /// Generate text from a conversation.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> LlmResult<Completion>;

    /// Convenience wrapper for the common system + single user prompt shape.
    async fn prompt(
        &self,
        model: &str,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> LlmResult<String> {
        let messages = [Message::system(system), Message::user(user)];
        let completion = self.complete(model, &messages, options).await?;
        if completion.text.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                model: completion.model,
            });
        }
        Ok(completion.text)
    }
}

/// Return the body of the first fenced block tagged `lang`, else the first
/// untagged fence, else the whole trimmed text.
pub fn extract_fenced_block<'a>(text: &'a str, lang: &str) -> &'a str {
    let tagged = format!("```{lang}");
    if let Some((_, rest)) = text.split_once(tagged.as_str()) {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some((_, rest)) = text.split_once("```") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    text.trim()
}

/// Deserialize a JSON object from model output, tolerating markdown fences.
///
/// This is a free function because generic methods are not dyn-compatible.
pub fn parse_ai_response<T: for<'de> Deserialize<'de>>(text: &str) -> LlmResult<T> {
    let json_text = extract_fenced_block(text, "json");
    serde_json::from_str(json_text).map_err(|e| LlmError::ResponseParse {
        reason: format!("failed to parse model output as JSON: {e}. Response: {text}"),
    })
}
