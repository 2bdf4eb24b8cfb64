//! AI-powered analysis: relevance scoring, query generation and reporting.
//!
//! The pipeline talks to these capabilities through the traits below so it
//! can be driven by scripted fakes in tests. The `Llm*` implementations back
//! them with an [`llm::LlmProvider`].

mod chunking;
mod prompts;
mod queries;
mod relevance;
mod summary;

use async_trait::async_trait;

use crate::task::ResearchTask;
use crate::types::{Evaluation, SearchHit, SearchQuery, Source};

pub use chunking::{chunk_text, truncate_chars};
pub use prompts::PromptManager;
pub use queries::{parse_query_list, LlmQueryGenerator, QueryParse};
pub use relevance::{blend_chunk_scores, interpret_reply, LlmRelevanceEvaluator};
pub use summary::{basic_summary, LlmReportGenerator};

/// Scores extracted content against the research task.
#[async_trait]
pub trait RelevanceEvaluator: Send + Sync {
    /// Never fails; an evaluator that cannot score returns
    /// [`Evaluation::neutral`].
    async fn evaluate(&self, hit: &SearchHit, content: &str, task: &ResearchTask) -> Evaluation;
}

/// Proposes search queries.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    /// Initial queries for a task. Never empty.
    async fn generate_queries(&self, task: &ResearchTask) -> Vec<SearchQuery>;

    /// Queries filling gaps left by `sources`, avoiding `previous_queries`.
    async fn generate_followup_queries(
        &self,
        task: &ResearchTask,
        sources: &[Source],
        previous_queries: &[String],
    ) -> Vec<SearchQuery>;
}

/// Writes the narrative report for a finished run.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn summarize(&self, task: &ResearchTask, sources: &[Source]) -> String;
}
