//! LLM provider abstraction for the web research pipeline.
//!
//! This crate provides:
//! - The [`LlmProvider`] trait every text-generation backend implements
//! - Message/option/response types shared by callers
//! - Helpers for pulling structured data out of model replies
//! - An Anthropic Claude implementation using the streaming Messages API

pub mod anthropic;
pub mod error;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use error::{LlmError, LlmResult};
pub use provider::{
    extract_fenced_block, parse_ai_response, Completion, CompletionOptions, LlmProvider, Message,
    Role, TokenUsage,
};
