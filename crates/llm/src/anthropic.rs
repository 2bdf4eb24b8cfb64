//! Anthropic Messages API provider (streaming).

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};
use crate::provider::{Completion, CompletionOptions, LlmProvider, Message, Role, TokenUsage};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Model used for scoring, query generation and summaries unless overridden.
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// Map short names to canonical API model identifiers.
pub fn normalize_model(model: &str) -> &str {
    match model {
        "haiku" => "claude-3-5-haiku-20241022",
        "sonnet" => "claude-sonnet-4-5-20250929",
        "opus" => "claude-opus-4-5-20251101",
        _ => model,
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Server-sent events we act on; anything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: StreamMessage },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: ContentDelta },
    #[serde(rename = "message_delta")]
    MessageDelta { usage: Option<StreamUsage> },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: ApiError },
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    model: String,
    usage: StreamUsage,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: String,
}

/// Accumulates streamed deltas into a [`Completion`].
#[derive(Debug)]
struct StreamAccumulator {
    text: String,
    usage: TokenUsage,
    model: String,
}

impl StreamAccumulator {
    fn new(model: &str) -> Self {
        Self {
            text: String::new(),
            usage: TokenUsage::default(),
            model: model.to_string(),
        }
    }

    /// Consume every complete `\n\n`-terminated event in `buffer`.
    ///
    /// Bytes are decoded per event, never per network chunk, so a multibyte
    /// character split across chunks stays intact.
    fn drain(&mut self, buffer: &mut Vec<u8>) -> LlmResult<()> {
        while let Some(end) = buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = buffer.drain(..end + 2).collect();
            let event = String::from_utf8_lossy(&raw);
            for line in event.lines() {
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
                    continue;
                };
                self.apply(event)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: StreamEvent) -> LlmResult<()> {
        match event {
            StreamEvent::MessageStart { message } => {
                self.model = message.model;
                self.usage.input_tokens = message.usage.input_tokens;
            }
            StreamEvent::ContentBlockDelta { delta } if delta.delta_type == "text_delta" => {
                self.text.push_str(&delta.text);
            }
            StreamEvent::MessageDelta { usage: Some(u) } => {
                self.usage.output_tokens = u.output_tokens;
            }
            StreamEvent::MessageStop => {
                tracing::debug!(
                    input_tokens = self.usage.input_tokens,
                    output_tokens = self.usage.output_tokens,
                    chars = self.text.len(),
                    "Claude stream finished"
                );
            }
            StreamEvent::Error { error } => {
                return Err(LlmError::Stream(format!(
                    "{} - {}",
                    error.error_type, error.message
                )));
            }
            StreamEvent::ContentBlockDelta { .. } | StreamEvent::MessageDelta { usage: None } => {}
        }
        Ok(())
    }

    fn finish(self) -> Completion {
        Completion {
            text: self.text,
            usage: self.usage,
            model: self.model,
        }
    }
}

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key.into()),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Create a provider from `ANTHROPIC_API_KEY`; unconfigured if unset.
    pub fn from_env() -> Self {
        Self {
            client: Client::new(),
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the provider at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Split out the system prompt; Anthropic takes it as a separate field.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<WireMessage>) {
        let mut system = None;
        let mut converted = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System => system = Some(msg.content.clone()),
                Role::User => converted.push(WireMessage {
                    role: "user",
                    content: msg.content.clone(),
                }),
                Role::Assistant => converted.push(WireMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                }),
            }
        }

        (system, converted)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> LlmResult<Completion> {
        let api_key = self.api_key.as_ref().ok_or_else(|| LlmError::NotConfigured {
            env_var: API_KEY_ENV.to_string(),
        })?;

        let model = normalize_model(model);
        let (system, converted) = Self::convert_messages(messages);

        let request = MessagesRequest {
            model: model.to_string(),
            messages: converted,
            max_tokens: options.max_tokens.unwrap_or(4096),
            system,
            temperature: options.temperature,
            stop_sequences: options.stop_sequences.clone(),
            stream: true,
        };

        tracing::debug!(model, "Calling Claude API (streaming)");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::Request(format!("failed to read error body: {e}")))?;
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(parsed) => format!("{} - {}", parsed.error.error_type, parsed.error.message),
                Err(_) => body,
            };
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut accumulator = StreamAccumulator::new(model);
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Stream(e.to_string()))?;
            buffer.extend_from_slice(&chunk);
            accumulator.drain(&mut buffer)?;
        }
        // A final event may arrive without the trailing blank line.
        if !buffer.trim_ascii().is_empty() {
            buffer.extend_from_slice(b"\n\n");
            accumulator.drain(&mut buffer)?;
        }

        Ok(accumulator.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(chunks: &[&str]) -> String {
        let mut body = String::from(
            "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"claude-3-5-haiku-20241022\",\"usage\":{\"input_tokens\":12,\"output_tokens\":0}}}\n\n",
        );
        for chunk in chunks {
            body.push_str(&format!(
                "event: content_block_delta\ndata: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":\"{chunk}\"}}}}\n\n"
            ));
        }
        body.push_str("event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":7}}\n\n");
        body.push_str("event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n");
        body
    }

    #[test]
    fn test_provider_name_and_configuration() {
        let provider = AnthropicProvider::new("sk-test");
        assert_eq!(provider.name(), "anthropic");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_normalize_model() {
        assert_eq!(normalize_model("haiku"), "claude-3-5-haiku-20241022");
        assert_eq!(normalize_model("claude-3-haiku-20240307"), "claude-3-haiku-20240307");
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You evaluate sources"),
            Message::user("Hello"),
            Message::assistant("Hi"),
            Message::user("Score this"),
        ];

        let (system, converted) = AnthropicProvider::convert_messages(&messages);

        assert_eq!(system.as_deref(), Some("You evaluate sources"));
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
        assert_eq!(converted[2].role, "user");
    }

    #[test]
    fn test_accumulator_handles_split_events() {
        let mut acc = StreamAccumulator::new("haiku");
        let body = sse_body(&["0.", "8"]);
        let (first, second) = body.split_at(body.len() / 2);

        let mut buffer = first.as_bytes().to_vec();
        acc.drain(&mut buffer).unwrap();
        buffer.extend_from_slice(second.as_bytes());
        acc.drain(&mut buffer).unwrap();

        let completion = acc.finish();
        assert_eq!(completion.text, "0.8");
        assert_eq!(completion.usage.input_tokens, 12);
        assert_eq!(completion.usage.output_tokens, 7);
        assert_eq!(completion.model, "claude-3-5-haiku-20241022");
    }

    #[test]
    fn test_accumulator_keeps_multibyte_chars_split_across_chunks() {
        let mut acc = StreamAccumulator::new("haiku");
        let body = sse_body(&["caf\u{e9}"]);
        let bytes = body.as_bytes();
        // Split between the two bytes of 'é' (0xC3 0xA9).
        let split = body.find('\u{e9}').unwrap() + 1;
        assert_eq!(bytes[split - 1], 0xC3);

        let mut buffer = bytes[..split].to_vec();
        acc.drain(&mut buffer).unwrap();
        buffer.extend_from_slice(&bytes[split..]);
        acc.drain(&mut buffer).unwrap();

        let completion = acc.finish();
        assert_eq!(completion.text, "caf\u{e9}");
        assert!(!completion.text.contains('\u{fffd}'));
    }

    #[test]
    fn test_accumulator_surfaces_stream_errors() {
        let mut acc = StreamAccumulator::new("haiku");
        let mut buffer = b"data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n".to_vec();
        let err = acc.drain(&mut buffer).unwrap_err();
        assert!(err.to_string().contains("overloaded_error"));
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["Hello", " world"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-test").with_base_url(server.uri());
        let text = provider
            .prompt("haiku", "system", "user", &CompletionOptions::new(0.0, 100))
            .await
            .unwrap();

        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_complete_maps_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_raw(
                r#"{"type":"error","error":{"type":"rate_limit_error","message":"Too many requests"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-test").with_base_url(server.uri());
        let err = provider
            .complete("haiku", &[Message::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate_limit_error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_fast() {
        let provider = AnthropicProvider {
            client: Client::new(),
            api_key: None,
            base_url: ANTHROPIC_API_URL.to_string(),
        };
        let err = provider
            .complete("haiku", &[Message::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_empty_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(&[]), "text/event-stream"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-test").with_base_url(server.uri());
        let err = provider
            .prompt("haiku", "s", "u", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }
}
