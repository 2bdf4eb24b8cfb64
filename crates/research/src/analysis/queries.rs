//! Search query generation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use llm::{extract_fenced_block, CompletionOptions, LlmProvider};

use super::prompts::{PromptManager, FOLLOWUP_QUERIES, INITIAL_QUERIES};
use super::QueryGenerator;
use crate::error::Result;
use crate::task::ResearchTask;
use crate::types::{SearchQuery, Source, MAX_IMPORTANCE, MIN_IMPORTANCE};

/// Outcome of reading a query list out of a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParse {
    Parsed(Vec<SearchQuery>),
    Fallback { reason: String },
}

#[derive(Debug, Deserialize)]
struct RawQuery {
    query: Option<String>,
    #[serde(default)]
    importance: Option<serde_yaml::Value>,
    #[serde(default)]
    site_restrict: Option<String>,
}

impl RawQuery {
    fn into_query(self) -> Option<SearchQuery> {
        let text = self.query?.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let importance = self
            .importance
            .as_ref()
            .and_then(|v| v.as_i64().or_else(|| v.as_str()?.trim().parse().ok()))
            .unwrap_or(i64::from(MIN_IMPORTANCE))
            .clamp(i64::from(MIN_IMPORTANCE), i64::from(MAX_IMPORTANCE));

        let query = SearchQuery::new(text, importance as u8);
        Some(match self.site_restrict {
            Some(site) => query.with_site(site.trim()),
            None => query,
        })
    }
}

/// Parse a YAML list of `{query, importance, site_restrict}` entries from a
/// model reply, looking inside a ```yaml fence, any fence, or the raw text.
pub fn parse_query_list(reply: &str) -> QueryParse {
    let yaml = extract_fenced_block(reply, "yaml");
    let raw: Vec<RawQuery> = match serde_yaml::from_str(yaml) {
        Ok(raw) => raw,
        Err(e) => {
            return QueryParse::Fallback {
                reason: format!("invalid YAML query list: {e}"),
            }
        }
    };

    let queries: Vec<SearchQuery> = raw.into_iter().filter_map(RawQuery::into_query).collect();
    if queries.is_empty() {
        return QueryParse::Fallback {
            reason: "reply contained no usable queries".to_string(),
        };
    }
    QueryParse::Parsed(queries)
}

/// Generates search queries with an LLM.
pub struct LlmQueryGenerator {
    provider: Arc<dyn LlmProvider>,
    prompts: Arc<PromptManager>,
    model: String,
}

impl LlmQueryGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, prompts: Arc<PromptManager>, model: impl Into<String>) -> Self {
        Self {
            provider,
            prompts,
            model: model.into(),
        }
    }

    /// Render, ask, parse. Any failure along the way becomes a fallback.
    async fn request(&self, template: &str, data: &serde_json::Value, system: &str, temperature: f32) -> QueryParse {
        match self.try_request(template, data, system, temperature).await {
            Ok(reply) => parse_query_list(&reply),
            Err(e) => QueryParse::Fallback {
                reason: e.to_string(),
            },
        }
    }

    async fn try_request(
        &self,
        template: &str,
        data: &serde_json::Value,
        system: &str,
        temperature: f32,
    ) -> Result<String> {
        let prompt = self.prompts.render(template, data)?;
        let reply = self
            .provider
            .prompt(&self.model, system, &prompt, &CompletionOptions::new(temperature, 1000))
            .await?;
        Ok(reply)
    }
}

#[async_trait]
impl QueryGenerator for LlmQueryGenerator {
    async fn generate_queries(&self, task: &ResearchTask) -> Vec<SearchQuery> {
        let data = serde_json::json!({ "task": task.to_prompt_json() });
        match self.request(INITIAL_QUERIES, &data, INITIAL_SYSTEM_PROMPT, 0.2).await {
            QueryParse::Parsed(queries) => {
                tracing::info!(count = queries.len(), "Generated initial queries");
                queries
            }
            QueryParse::Fallback { reason } => {
                tracing::warn!(%reason, "Initial query generation failed, searching the topic directly");
                vec![SearchQuery::new(format!("Research {}", task.topic), MIN_IMPORTANCE)]
            }
        }
    }

    async fn generate_followup_queries(
        &self,
        task: &ResearchTask,
        sources: &[Source],
        previous_queries: &[String],
    ) -> Vec<SearchQuery> {
        let digest: Vec<serde_json::Value> = sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "title": s.title,
                    "url": s.url,
                    "snippet": s.snippet,
                    "relevance": s.relevance_score,
                })
            })
            .collect();

        let data = serde_json::json!({
            "task": task.to_prompt_json(),
            "previous_queries": serde_json::to_string_pretty(previous_queries).unwrap_or_default(),
            "sources": serde_json::to_string_pretty(&digest).unwrap_or_default(),
        });

        match self.request(FOLLOWUP_QUERIES, &data, FOLLOWUP_SYSTEM_PROMPT, 0.3).await {
            QueryParse::Parsed(queries) => {
                tracing::info!(count = queries.len(), "Generated follow-up queries");
                queries
            }
            QueryParse::Fallback { reason } => {
                tracing::warn!(%reason, "Follow-up query generation failed");
                Vec::new()
            }
        }
    }
}

const INITIAL_SYSTEM_PROMPT: &str = "You are a helpful research assistant that generates effective search queries.";
const FOLLOWUP_SYSTEM_PROMPT: &str =
    "You are a helpful research assistant that generates effective follow-up search queries.";
