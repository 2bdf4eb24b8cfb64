//! Narrative reports over the accepted sources.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

use llm::{CompletionOptions, LlmProvider};

use super::chunking::chunk_text;
use super::prompts::{PromptManager, CHUNK_SUMMARY, RESEARCH_SUMMARY, SOURCE_SUMMARY, UNIFY_SUMMARY};
use super::ReportGenerator;
use crate::error::Result;
use crate::task::ResearchTask;
use crate::types::Source;

/// Sources longer than this (in chars) are summarized chunk by chunk.
pub const SUMMARY_CHUNKING_THRESHOLD: usize = 20_000;
pub const SUMMARY_CHUNK_SIZE: usize = 18_000;
pub const SUMMARY_CHUNK_OVERLAP: usize = 1_000;

/// Most suggested topics listed in a basic summary.
pub const MAX_SUGGESTED_TOPICS: usize = 10;

/// Deterministic markdown summary built from each source's key points.
pub fn basic_summary(task: &ResearchTask, sources: &[Source]) -> String {
    let mut lines = vec![
        format!("# Research Summary: {}", task.topic),
        "\n## Key Sources and Findings\n".to_string(),
    ];

    for (i, source) in sources.iter().enumerate() {
        lines.push(format!("### {}. {}", i + 1, source.title));
        lines.push(format!("**URL:** {}", source.url));
        lines.push(format!("**Relevance Score:** {:.2}\n", source.relevance_score));
        lines.push(format!("**Key Points:**\n{}\n", source.short_summary));
    }

    let mut topics: Vec<&str> = Vec::new();
    for topic in sources.iter().flat_map(Source::topic_lines) {
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }

    if !topics.is_empty() {
        lines.push("\n## Suggested Further Research\n".to_string());
        for topic in topics.iter().take(MAX_SUGGESTED_TOPICS) {
            lines.push(format!("- {topic}"));
        }
    }

    lines.push(
        "\n\n*Note: This is a basic summary. Run without `--basic-summary` for a detailed analysis.*"
            .to_string(),
    );

    lines.join("\n")
}

/// Writes detailed reports with an LLM: a summary per source, then an
/// overall summary citing sources by number.
pub struct LlmReportGenerator {
    provider: Arc<dyn LlmProvider>,
    prompts: Arc<PromptManager>,
    model: String,
}

impl LlmReportGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, prompts: Arc<PromptManager>, model: impl Into<String>) -> Self {
        Self {
            provider,
            prompts,
            model: model.into(),
        }
    }

    async fn ask(&self, template: &str, data: &serde_json::Value, system: &str, options: &CompletionOptions) -> Result<String> {
        let prompt = self.prompts.render(template, data)?;
        Ok(self.provider.prompt(&self.model, system, &prompt, options).await?)
    }

    /// Summary of one source. Never fails; errors produce bracketed text.
    async fn summarize_source(&self, task_json: &str, source: &Source) -> String {
        if source.content.chars().count() <= SUMMARY_CHUNKING_THRESHOLD {
            let data = serde_json::json!({
                "task": task_json,
                "title": source.title,
                "url": source.url,
                "content": source.content,
            });
            return match self
                .ask(SOURCE_SUMMARY, &data, SOURCE_SYSTEM_PROMPT, &CompletionOptions::new(0.1, 4000))
                .await
            {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(url = %source.url, error = %e, "Source summary failed");
                    format!(
                        "[Document summary could not be generated: {e}]\n\nTitle: {}\nURL: {}\n\nThis document appears relevant to the research task but could not be summarized automatically.",
                        source.title, source.url
                    )
                }
            };
        }

        let chunks = chunk_text(&source.content, SUMMARY_CHUNK_SIZE, SUMMARY_CHUNK_OVERLAP);
        let mut chunk_summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            tracing::debug!(url = %source.url, chunk = i + 1, total = chunks.len(), "Summarizing chunk");
            let data = serde_json::json!({
                "task": task_json,
                "title": source.title,
                "url": source.url,
                "chunk_number": i + 1,
                "chunk_count": chunks.len(),
                "content": chunk,
            });
            let summary = match self
                .ask(CHUNK_SUMMARY, &data, SOURCE_SYSTEM_PROMPT, &CompletionOptions::new(0.1, 3000))
                .await
            {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(url = %source.url, chunk = i + 1, error = %e, "Chunk summary failed");
                    format!("[Content from chunk {} could not be summarized: {e}]", i + 1)
                }
            };
            chunk_summaries.push(summary);
        }

        let combined = chunk_summaries
            .iter()
            .enumerate()
            .map(|(i, s)| format!("--- Chunk {} Summary ---\n{s}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n");

        let data = serde_json::json!({
            "task": task_json,
            "title": source.title,
            "url": source.url,
            "chunk_summaries": combined,
        });
        match self
            .ask(UNIFY_SUMMARY, &data, SOURCE_SYSTEM_PROMPT, &CompletionOptions::new(0.1, 4000))
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(url = %source.url, error = %e, "Unified summary failed, keeping chunk summaries");
                chunk_summaries
                    .iter()
                    .enumerate()
                    .map(|(i, s)| format!("### Chunk {} Summary\n{s}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        }
    }
}

#[async_trait]
impl ReportGenerator for LlmReportGenerator {
    async fn summarize(&self, task: &ResearchTask, sources: &[Source]) -> String {
        if sources.is_empty() {
            return basic_summary(task, sources);
        }

        let task_json = task.to_prompt_json();

        let mut source_summaries = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            tracing::info!(index = i + 1, total = sources.len(), title = %source.title, "Summarizing source");
            source_summaries.push(self.summarize_source(&task_json, source).await);
        }

        let references: Vec<serde_json::Value> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| {
                serde_json::json!({
                    "index": i + 1,
                    "title": s.title,
                    "url": s.url,
                    "relevance": s.relevance_score,
                })
            })
            .collect();
        let data = serde_json::json!({
            "task": task_json,
            "sources": serde_json::to_string_pretty(&references).unwrap_or_default(),
        });

        let main = match self
            .ask(RESEARCH_SUMMARY, &data, REPORT_SYSTEM_PROMPT, &CompletionOptions::new(0.2, 4000))
            .await
        {
            Ok(main) => main,
            Err(e) => {
                tracing::warn!(error = %e, "Research summary failed, falling back to basic summary");
                return basic_summary(task, sources);
            }
        };

        let mut details = String::from("\n\n## Detailed Source Summaries\n\n");
        for (i, (source, summary)) in sources.iter().zip(&source_summaries).enumerate() {
            let _ = write!(
                details,
                "### Source [{}]: {}\n**URL:** {}\n**Relevance Score:** {:.2}\n\n{summary}\n\n---\n\n",
                i + 1,
                source.title,
                source.url,
                source.relevance_score
            );
        }

        format!("{main}\n\n{details}")
    }
}

const SOURCE_SYSTEM_PROMPT: &str =
    "You are a helpful research assistant extracting key information from documents.";
const REPORT_SYSTEM_PROMPT: &str = "You are a helpful research assistant summarizing web research findings.";
