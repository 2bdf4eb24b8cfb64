//! Web research CLI - iterative, relevance-guided source gathering.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use llm::{AnthropicProvider, LlmProvider};
use web_research::analysis::{
    LlmQueryGenerator, LlmRelevanceEvaluator, LlmReportGenerator, PromptManager,
};
use web_research::config::{
    mask_secret, Credentials, ANTHROPIC_API_KEY_ENV, DEFAULT_MAX_SEARCHES, DEFAULT_MAX_SOURCES,
    DEFAULT_OUTPUT_DIR, GOOGLE_API_KEY_ENV, GOOGLE_CSE_ID_ENV,
};
use web_research::extraction::HttpContentExtractor;
use web_research::search::GoogleSearchProvider;
use web_research::storage::{ResearchIndex, INDEX_FILE};
use web_research::{ResearchConfig, ResearchOutcome, ResearchPipeline, ResearchTask};

/// Config file picked up when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Web research CLI - search, score and summarize sources for a topic.
#[derive(Parser)]
#[command(name = "web-research")]
#[command(about = "Iterative LLM-guided web research")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Research a topic described by a YAML request
    Run {
        /// YAML request file (reads stdin when omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Base output directory; a timestamp is appended per run
        #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Maximum number of sources to keep
        #[arg(long, short = 's', default_value_t = DEFAULT_MAX_SOURCES)]
        max_sources: usize,

        /// Maximum number of searches to run
        #[arg(long, short = 'q', default_value_t = DEFAULT_MAX_SEARCHES)]
        max_searches: usize,

        /// JSON file holding API keys
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Delay between search requests, in seconds
        #[arg(long, short, default_value = "1.0")]
        delay: f64,

        /// Model used for scoring, query generation and summaries
        #[arg(long, default_value = llm::anthropic::DEFAULT_MODEL)]
        model: String,

        /// Skip per-source LLM summaries and write a basic report
        #[arg(long)]
        basic_summary: bool,
    },

    /// Inspect or store API keys
    Configure {
        #[arg(long)]
        google_api_key: Option<String>,

        #[arg(long)]
        google_cse_id: Option<String>,

        #[arg(long)]
        anthropic_api_key: Option<String>,

        /// JSON config file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Write the merged keys back to the config file
        #[arg(long)]
        save: bool,
    },

    /// List the sources of a finished run
    List {
        /// Run directory containing index.json
        #[arg(long)]
        dir: PathBuf,

        /// Limit results
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("web_research=debug,llm=debug,info")
        } else {
            EnvFilter::new("web_research=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            input,
            output,
            max_sources,
            max_searches,
            config,
            delay,
            model,
            basic_summary,
        } => {
            let research_config = ResearchConfig {
                max_sources,
                max_searches,
                request_delay: delay,
                verbose: cli.verbose,
                generate_detailed_summaries: !basic_summary,
                model,
                output_dir: output,
            };
            tracing::info!(
                max_sources,
                max_searches,
                delay,
                model = %research_config.model,
                detailed = research_config.generate_detailed_summaries,
                "Starting research run"
            );
            run_research(input, config, research_config).await
        }
        Commands::Configure {
            google_api_key,
            google_cse_id,
            anthropic_api_key,
            config,
            save,
        } => run_configure(
            Credentials {
                google_api_key,
                google_cse_id,
                anthropic_api_key,
            },
            &config,
            save,
        ),
        Commands::List { dir, limit } => run_list(&dir, limit),
    }
}

async fn run_research(
    input: Option<PathBuf>,
    config_file: Option<PathBuf>,
    config: ResearchConfig,
) -> Result<()> {
    config.validate().context("Invalid run options")?;
    let yaml = read_request(input.as_deref())?;
    let task = ResearchTask::from_yaml(&yaml).context("Invalid research request")?;

    let config_file = config_file.or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    });
    let credentials = Credentials::load(config_file.as_deref())?
        .validate()
        .context("Run `web-research configure` or set the API key environment variables")?;
    tracing::debug!(?credentials, "Loaded credentials");

    let provider: Arc<dyn LlmProvider> =
        Arc::new(AnthropicProvider::new(credentials.anthropic_api_key.clone()));
    let prompts = Arc::new(PromptManager::new()?);

    let search = GoogleSearchProvider::new(
        credentials.google_api_key.clone(),
        credentials.google_cse_id.clone(),
        config.request_delay(),
    )?;
    let extractor = HttpContentExtractor::new()?;
    let evaluator = LlmRelevanceEvaluator::new(provider.clone(), prompts.clone(), &config.model);
    let queries = LlmQueryGenerator::new(provider.clone(), prompts.clone(), &config.model);
    let reporter = LlmReportGenerator::new(provider, prompts, &config.model);

    let pipeline = ResearchPipeline::new(
        config,
        Arc::new(search),
        Arc::new(extractor),
        Arc::new(evaluator),
        Arc::new(queries),
        Arc::new(reporter),
    );

    println!("\n{} {}", "🔎 Researching:".bold(), task.topic.cyan());
    let outcome = pipeline.conduct_research(&task).await?;
    print_outcome(&outcome);

    Ok(())
}

fn read_request(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display())),
        None => {
            eprintln!("Enter the research request as YAML, then EOF (Ctrl-D):");
            let mut yaml = String::new();
            std::io::stdin()
                .read_to_string(&mut yaml)
                .context("Failed to read request from stdin")?;
            Ok(yaml)
        }
    }
}

fn print_outcome(outcome: &ResearchOutcome) {
    let stats = &outcome.stats;

    println!("\n{}", "📊 Research Summary".bold());
    println!("   Searches: {}", stats.iterations);
    println!("   Results seen: {}", stats.results_seen);
    println!("   Accepted: {}", stats.accepted.to_string().green());
    println!("   Rejected: {}", stats.rejected);
    if stats.extraction_failures > 0 {
        println!("   Extraction failures: {}", stats.extraction_failures.to_string().yellow());
    }
    if stats.skipped_duplicate_queries > 0 {
        println!("   Duplicate queries skipped: {}", stats.skipped_duplicate_queries);
    }

    if outcome.sources.is_empty() {
        println!("\n{}", "📭 No relevant sources found".yellow());
    } else {
        println!("\n{}", "Top sources:".bold());
        for (i, source) in outcome.sources.iter().enumerate() {
            println!(
                "   {}. [{:.2}] {}",
                i + 1,
                source.relevance_score,
                source.title
            );
            println!("      {}", source.url.dimmed());
        }
    }

    println!(
        "\n✅ Results saved to {}",
        outcome.output_dir.display().to_string().green()
    );
}

fn run_configure(provided: Credentials, config: &Path, save: bool) -> Result<()> {
    let mut credentials = if config.exists() {
        Credentials::from_file(config)
            .with_context(|| format!("Failed to read config file {}", config.display()))?
    } else {
        Credentials::default()
    };
    credentials.merge(Credentials::from_lookup(|key| std::env::var(key).ok()));
    credentials.merge(provided);

    println!("{}", "🔑 API keys".bold());
    for (name, value) in [
        (GOOGLE_API_KEY_ENV, &credentials.google_api_key),
        (GOOGLE_CSE_ID_ENV, &credentials.google_cse_id),
        (ANTHROPIC_API_KEY_ENV, &credentials.anthropic_api_key),
    ] {
        match value {
            Some(v) => println!("   {name}: {}", mask_secret(v).green()),
            None => println!("   {name}: {}", "missing".red()),
        }
    }

    if save {
        credentials
            .save(config)
            .with_context(|| format!("Failed to write config file {}", config.display()))?;
        println!("\n✅ Saved to {}", config.display());
    }

    let missing = credentials.missing_keys();
    if !missing.is_empty() {
        println!(
            "\n{} {}",
            "⚠️  Missing:".yellow(),
            missing.join(", ")
        );
        println!("   Set them with --google-api-key/--google-cse-id/--anthropic-api-key or in the environment.");
    }

    Ok(())
}

fn run_list(dir: &Path, limit: usize) -> Result<()> {
    let index = ResearchIndex::load(&dir.join(INDEX_FILE))
        .with_context(|| format!("Failed to read index in {}", dir.display()))?;

    println!("📋 Sources in {}\n", dir.display());
    if !index.topic.is_empty() {
        println!("Topic: {}\n", index.topic.cyan());
    }

    let entries = index.top(limit);
    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    for entry in &entries {
        println!("🔖 {}. {} ({})", entry.rank, entry.title.bold(), entry.content_type);
        println!("   {}", entry.url.dimmed());
        println!("   Score: {:.2} | {}\n", entry.score, entry.file);
    }

    println!("Total: {} entries", entries.len());

    Ok(())
}
