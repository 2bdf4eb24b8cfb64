//! Research pipeline - orchestrates the search-extract-score-expand loop.

use chrono::Local;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::analysis::{basic_summary, QueryGenerator, RelevanceEvaluator, ReportGenerator};
use crate::config::ResearchConfig;
use crate::error::Result;
use crate::extraction::ContentExtractor;
use crate::queue::QueryQueue;
use crate::registry::SourceRegistry;
use crate::search::SearchProvider;
use crate::storage::{run_directory, OutputWriter};
use crate::task::ResearchTask;
use crate::types::{SearchHit, SearchQuery, Source};

/// Only the top results of each search are considered.
pub const RESULTS_PER_QUERY: usize = 5;

/// Sources scoring at least this much are kept.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.5;

/// Where the pipeline is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchPhase {
    Init,
    Querying,
    Searching,
    Extracting,
    Scoring,
    ExpandingQueries,
    Finalizing,
    Done,
}

impl fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Querying => "querying",
            Self::Searching => "searching",
            Self::Extracting => "extracting",
            Self::Scoring => "scoring",
            Self::ExpandingQueries => "expanding_queries",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Searches executed.
    pub iterations: usize,
    /// Popped queries dropped because an identical query already ran.
    pub skipped_duplicate_queries: usize,
    pub results_seen: usize,
    pub extraction_failures: usize,
    /// Scored below the acceptance threshold.
    pub rejected: usize,
    pub accepted: usize,
    pub followup_rounds: usize,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// Full markdown report as written to `research_summary.md`.
    pub report: String,
    /// The narrative summary embedded in the report.
    pub summary: String,
    /// Final sources, best first.
    pub sources: Vec<Source>,
    pub file_paths: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub stats: RunStats,
}

/// Mutable state owned by one run of the loop.
struct ResearchContext {
    queue: QueryQueue,
    registry: SourceRegistry,
    /// Texts of executed queries, in execution order.
    executed: Vec<String>,
    iteration: usize,
    phase: ResearchPhase,
    stats: RunStats,
}

impl ResearchContext {
    fn new() -> Self {
        Self {
            queue: QueryQueue::new(),
            registry: SourceRegistry::new(),
            executed: Vec::new(),
            iteration: 0,
            phase: ResearchPhase::Init,
            stats: RunStats::default(),
        }
    }

    fn enter(&mut self, phase: ResearchPhase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "Phase transition");
            self.phase = phase;
        }
    }
}

/// Research pipeline orchestrator.
pub struct ResearchPipeline {
    config: ResearchConfig,
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn ContentExtractor>,
    evaluator: Arc<dyn RelevanceEvaluator>,
    queries: Arc<dyn QueryGenerator>,
    reporter: Arc<dyn ReportGenerator>,
}

impl ResearchPipeline {
    /// Create a new pipeline.
    #[must_use]
    pub fn new(
        config: ResearchConfig,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn ContentExtractor>,
        evaluator: Arc<dyn RelevanceEvaluator>,
        queries: Arc<dyn QueryGenerator>,
        reporter: Arc<dyn ReportGenerator>,
    ) -> Self {
        Self {
            config,
            search,
            extractor,
            evaluator,
            queries,
            reporter,
        }
    }

    /// Parse a YAML request and research it.
    pub async fn conduct_research_yaml(&self, yaml: &str) -> Result<ResearchOutcome> {
        let task = ResearchTask::from_yaml(yaml)?;
        self.conduct_research(&task).await
    }

    /// Run the full loop, summarize, and write everything to a fresh
    /// timestamped directory.
    pub async fn conduct_research(&self, task: &ResearchTask) -> Result<ResearchOutcome> {
        self.config.validate()?;
        let started_at = Local::now();
        let output_dir = run_directory(&self.config.output_dir, started_at);

        tracing::info!(topic = %task.topic, output = %output_dir.display(), "Starting research");

        let (sources, stats) = self.collect_sources(task).await;

        let summary = if self.config.generate_detailed_summaries {
            tracing::info!(sources = sources.len(), "Generating detailed research summary");
            self.reporter.summarize(task, &sources).await
        } else {
            tracing::info!(sources = sources.len(), "Generating basic research summary");
            basic_summary(task, &sources)
        };

        let saved = OutputWriter::new(output_dir.clone()).write(task, &sources, &summary, Local::now())?;
        tracing::info!(
            phase = %ResearchPhase::Done,
            sources = sources.len(),
            report = %saved.report_path.display(),
            "Research complete"
        );

        Ok(ResearchOutcome {
            report: saved.report,
            summary,
            sources,
            file_paths: saved.file_paths,
            output_dir,
            stats,
        })
    }

    /// The search-evaluate-expand loop. Returns the final sources, ranked
    /// and truncated to `max_sources`.
    pub async fn collect_sources(&self, task: &ResearchTask) -> (Vec<Source>, RunStats) {
        let max_sources = self.config.max_sources;
        let max_searches = self.config.max_searches;
        let mut ctx = ResearchContext::new();

        ctx.enter(ResearchPhase::Querying);
        let initial = self.queries.generate_queries(task).await;
        let seeded = ctx.queue.enqueue_many(initial);
        tracing::info!(count = seeded, "Seeded query queue");

        while ctx.iteration < max_searches {
            let Some(query) = ctx.queue.pop_highest() else {
                tracing::info!("Query queue exhausted");
                break;
            };

            let key = query.key();
            if ctx.queue.is_completed(&key) {
                tracing::debug!(query = %key, "Skipping already executed query");
                ctx.stats.skipped_duplicate_queries += 1;
                continue;
            }

            tracing::info!(
                iteration = ctx.iteration + 1,
                max = max_searches,
                query = %query.full_text(),
                importance = query.importance,
                "Executing search"
            );

            ctx.enter(ResearchPhase::Searching);
            let hits = self
                .search
                .search(&query.text, query.site_restriction.as_deref())
                .await;
            tracing::info!(results = hits.len(), "Search complete");

            self.process_hits(task, &mut ctx, hits).await;

            ctx.queue.mark_completed(key);
            ctx.executed.push(query.text.clone());
            ctx.stats.iterations += 1;

            if ctx.registry.len() < max_sources && ctx.iteration + 1 < max_searches {
                self.expand_queries(task, &mut ctx).await;
            }

            ctx.iteration += 1;
        }

        ctx.enter(ResearchPhase::Finalizing);
        for query in ctx.queue.pending() {
            tracing::debug!(query = %query.full_text(), importance = query.importance, "Query left unexecuted");
        }
        let completed_queries = ctx.queue.completed_count();
        let pending_queries = ctx.queue.len();
        let ResearchContext { registry, stats, .. } = ctx;
        let sources = registry.rank_and_truncate(max_sources);

        tracing::info!(
            sources = sources.len(),
            iterations = stats.iterations,
            completed_queries,
            pending_queries,
            skipped_queries = stats.skipped_duplicate_queries,
            results_seen = stats.results_seen,
            extraction_failures = stats.extraction_failures,
            accepted = stats.accepted,
            rejected = stats.rejected,
            followup_rounds = stats.followup_rounds,
            "Research loop complete"
        );

        (sources, stats)
    }

    async fn process_hits(&self, task: &ResearchTask, ctx: &mut ResearchContext, hits: Vec<SearchHit>) {
        for hit in hits.into_iter().take(RESULTS_PER_QUERY) {
            ctx.stats.results_seen += 1;

            if ctx.registry.contains(&hit.url) {
                tracing::debug!(url = %hit.url, "Already have this source");
                continue;
            }

            ctx.enter(ResearchPhase::Extracting);
            tracing::info!(url = %hit.url, "Processing result");
            let content = self.extractor.extract(&hit.url).await;
            if content.is_error() {
                tracing::warn!(url = %hit.url, "Skipping due to extraction error");
                ctx.stats.extraction_failures += 1;
                continue;
            }

            ctx.enter(ResearchPhase::Scoring);
            let evaluation = self.evaluator.evaluate(&hit, &content.text, task).await;
            let score = evaluation.score;

            if score >= ACCEPTANCE_THRESHOLD {
                let url = hit.url.clone();
                if self.config.verbose && !evaluation.research_topics.is_empty() {
                    tracing::info!(url = %url, topics = %evaluation.research_topics, "Suggested research topics");
                }
                match ctx.registry.insert(Source::from_parts(hit, content, evaluation)) {
                    Ok(()) => {
                        ctx.stats.accepted += 1;
                        tracing::info!(url = %url, score, total = ctx.registry.len(), "Accepted source");
                    }
                    Err(e) => tracing::warn!(error = %e, "Source not added"),
                }
            } else {
                ctx.stats.rejected += 1;
                tracing::debug!(url = %hit.url, score, threshold = ACCEPTANCE_THRESHOLD, "Below relevance threshold");
            }

            // Checked only after a scored result; the registry may overshoot
            // until finalizing ranks and truncates it.
            if ctx.registry.len() >= self.config.max_sources {
                tracing::info!(max = self.config.max_sources, "Source budget reached");
                break;
            }
        }
    }

    async fn expand_queries(&self, task: &ResearchTask, ctx: &mut ResearchContext) {
        ctx.enter(ResearchPhase::ExpandingQueries);
        let followups: Vec<SearchQuery> = self
            .queries
            .generate_followup_queries(task, ctx.registry.all(), &ctx.executed)
            .await;
        let proposed = followups.len();
        let added = ctx.queue.enqueue_many(followups);
        ctx.stats.followup_rounds += 1;
        tracing::info!(proposed, added, pending = ctx.queue.len(), "Generated follow-up queries");
    }
}
