//! Relevance scoring of fetched sources.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

use llm::{parse_ai_response, CompletionOptions, LlmProvider};

use super::chunking::{chunk_text, truncate_chars};
use super::prompts::{PromptManager, RELEVANCE};
use super::RelevanceEvaluator;
use crate::error::Result;
use crate::task::ResearchTask;
use crate::types::{clamp_score, Evaluation, SearchHit};

/// Documents at least this long (in chars) are scored chunk by chunk.
pub const CHUNKING_THRESHOLD: usize = 12_000;
pub const CHUNK_SIZE: usize = 10_000;
pub const CHUNK_OVERLAP: usize = 1_000;
/// Content cap for a single scoring prompt.
pub const MAX_PROMPT_CONTENT: usize = 8_000;

const TRUNCATION_MARKER: &str = "... [content truncated due to length]";

static SCORE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").ok());

/// Model output may give bullet text either as one string or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BulletText {
    Text(String),
    List(Vec<String>),
}

impl BulletText {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(|item| format!("• {}", item.trim_start_matches(['•', '-', '*']).trim()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Raw response from AI for parsing.
#[derive(Debug, Deserialize)]
struct RawRelevanceResponse {
    score: f32,
    #[serde(default)]
    short_summary: Option<BulletText>,
    #[serde(default)]
    research_topics: Option<BulletText>,
}

/// Interpret a scoring reply: JSON first, then the first number anywhere in
/// the text, then the neutral score.
pub fn interpret_reply(reply: &str) -> Evaluation {
    if let Ok(raw) = parse_ai_response::<RawRelevanceResponse>(reply) {
        return Evaluation {
            score: clamp_score(raw.score),
            short_summary: raw.short_summary.map(BulletText::into_text).unwrap_or_default(),
            research_topics: raw
                .research_topics
                .map(BulletText::into_text)
                .unwrap_or_default(),
        };
    }

    let number = SCORE_PATTERN
        .as_ref()
        .and_then(|re| re.find(reply))
        .and_then(|m| m.as_str().parse::<f32>().ok());

    match number {
        Some(score) => Evaluation::new(score),
        None => {
            tracing::warn!(reply = %reply, "Could not extract a score from model reply");
            Evaluation::neutral()
        }
    }
}

/// Combine per-chunk scores into one document score.
///
/// More than two chunks: the best chunk counts 50%, the second 30% and the
/// mean of the rest 20%. Otherwise the plain mean.
pub fn blend_chunk_scores(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return Evaluation::NEUTRAL_SCORE;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    #[allow(clippy::cast_precision_loss)]
    let blended = if sorted.len() > 2 {
        let rest = &sorted[2..];
        let rest_mean = rest.iter().sum::<f32>() / rest.len() as f32;
        sorted[0] * 0.5 + sorted[1] * 0.3 + rest_mean * 0.2
    } else {
        sorted.iter().sum::<f32>() / sorted.len() as f32
    };

    clamp_score(blended)
}

/// Scores sources by asking an LLM.
pub struct LlmRelevanceEvaluator {
    provider: Arc<dyn LlmProvider>,
    prompts: Arc<PromptManager>,
    model: String,
}

impl LlmRelevanceEvaluator {
    pub fn new(provider: Arc<dyn LlmProvider>, prompts: Arc<PromptManager>, model: impl Into<String>) -> Self {
        Self {
            provider,
            prompts,
            model: model.into(),
        }
    }

    async fn evaluate_chunk(
        &self,
        hit: &SearchHit,
        content: &str,
        task: &ResearchTask,
        chunk_info: Option<String>,
    ) -> Result<Evaluation> {
        let (capped, truncated) = truncate_chars(content, MAX_PROMPT_CONTENT);
        let content = if truncated {
            format!("{capped}{TRUNCATION_MARKER}")
        } else {
            capped.to_string()
        };

        let prompt = self.prompts.render(
            RELEVANCE,
            &serde_json::json!({
                "task": task.to_prompt_json(),
                "title": hit.title,
                "url": hit.url,
                "snippet": hit.snippet,
                "chunk_info": chunk_info,
                "content": content,
            }),
        )?;

        let reply = self
            .provider
            .prompt(&self.model, SYSTEM_PROMPT, &prompt, &CompletionOptions::new(0.0, 1000))
            .await?;

        Ok(interpret_reply(&reply))
    }
}

#[async_trait]
impl RelevanceEvaluator for LlmRelevanceEvaluator {
    async fn evaluate(&self, hit: &SearchHit, content: &str, task: &ResearchTask) -> Evaluation {
        if content.chars().count() < CHUNKING_THRESHOLD {
            return match self.evaluate_chunk(hit, content, task, None).await {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    tracing::warn!(url = %hit.url, error = %e, "Relevance evaluation failed, using neutral score");
                    Evaluation::neutral()
                }
            };
        }

        let chunks = chunk_text(content, CHUNK_SIZE, CHUNK_OVERLAP);
        tracing::debug!(url = %hit.url, chunks = chunks.len(), "Scoring large document in chunks");

        let mut evaluations = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let info = format!("Chunk {} of {}", i + 1, chunks.len());
            let evaluation = match self.evaluate_chunk(hit, chunk, task, Some(info)).await {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    tracing::warn!(url = %hit.url, chunk = i + 1, error = %e, "Chunk evaluation failed");
                    Evaluation::neutral()
                }
            };
            evaluations.push(evaluation);
        }

        let scores: Vec<f32> = evaluations.iter().map(|e| e.score).collect();
        let score = blend_chunk_scores(&scores);

        // Key points and topics come from the strongest chunk.
        let best = evaluations
            .into_iter()
            .reduce(|best, next| if next.score > best.score { next } else { best })
            .unwrap_or_else(Evaluation::neutral);

        Evaluation {
            score,
            short_summary: best.short_summary,
            research_topics: best.research_topics,
        }
    }
}

const SYSTEM_PROMPT: &str = "You evaluate how relevant a web source is to a research task. Always respond with valid JSON containing a score between 0.0 and 1.0, key points and suggested research topics.";
