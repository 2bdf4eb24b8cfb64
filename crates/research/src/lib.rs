//! Iterative, relevance-guided web research.
//!
//! This crate provides:
//! - A prioritized query queue seeded and expanded by an LLM
//! - Google Custom Search with rate-limit aware retries
//! - HTML and PDF text extraction
//! - LLM relevance scoring with chunked evaluation of long documents
//! - A markdown report plus one plain-text file per accepted source

pub mod analysis;
pub mod config;
pub mod error;
pub mod extraction;
pub mod http;
pub mod pipeline;
pub mod queue;
pub mod registry;
pub mod search;
pub mod storage;
pub mod task;
pub mod types;

// Re-export main types
pub use config::{Credentials, ResearchConfig, ValidatedCredentials};
pub use error::{ResearchError, Result};
pub use pipeline::{ResearchOutcome, ResearchPhase, ResearchPipeline, RunStats};
pub use task::ResearchTask;
pub use types::{ContentType, Evaluation, ExtractedContent, SearchHit, SearchQuery, Source};
