//! # Policy RAG CLI (`policy-rag`)
//!
//! ## Usage
//!
//! ```bash
//! policy-rag --config ./config/policy-rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `policy-rag ingest` | Chunk and index `data.dir` into the configured store |
//! | `policy-rag query "<question>"` | Answer one question |
//! | `policy-rag chat` | Interactive question loop |
//! | `policy-rag eval` | Run the evaluation battery with manual scoring |
//! | `policy-rag models` | List advertised models and the one that would be used |
//!
//! `query`, `chat`, `eval`, and `models` need the API key named by
//! `llm.api_key_env` (`GROQ_API_KEY` by default), read from the environment
//! or a `.env` file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use policy_rag::config::{self, Config};
use policy_rag::embedding::create_embedder;
use policy_rag::eval::{self, EVAL_CASES};
use policy_rag::generate::AnswerGenerator;
use policy_rag::ingest;
use policy_rag::llm::{CompletionService, OpenAiCompatClient};
use policy_rag::pipeline::RagPipeline;
use policy_rag::prompt::PromptTemplate;
use policy_rag::shell::{self, PromptSet};
use policy_rag::store::open_store;

/// Policy RAG: ask questions about a folder of policy documents.
#[derive(Parser)]
#[command(
    name = "policy-rag",
    about = "Retrieval-augmented question answering over plain-text policy documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/policy-rag.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest `data.dir` into the configured vector store.
    ///
    /// Each `*.txt` file replaces whatever was previously indexed under its
    /// file name.
    Ingest {
        /// Show document and chunk counts without embedding or storing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a single question.
    Query {
        /// The question to ask.
        question: String,

        /// Use the basic template instead of the constrained one.
        #[arg(long)]
        basic: bool,

        /// Print the question, answer, and context as JSON.
        #[arg(long)]
        json: bool,

        /// Skip ingestion and query the existing index (sqlite backend).
        #[arg(long)]
        no_ingest: bool,
    },

    /// Interactive question loop.
    ///
    /// Type `switch` to toggle templates and `exit` or `quit` to leave.
    Chat {
        /// Skip ingestion and query the existing index (sqlite backend).
        #[arg(long)]
        no_ingest: bool,
    },

    /// Run the fixed evaluation battery and score answers by hand.
    Eval {
        /// Skip ingestion and query the existing index (sqlite backend).
        #[arg(long)]
        no_ingest: bool,
    },

    /// List the models the completion service advertises.
    Models,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Built-in templates, with `prompts.custom_path` replacing the primary one.
fn load_prompts(cfg: &Config) -> Result<PromptSet> {
    let mut prompts = PromptSet::default();
    if let Some(path) = &cfg.prompts.custom_path {
        prompts.primary = PromptTemplate::from_file(path)?;
    }
    Ok(prompts)
}

async fn build_pipeline(cfg: &Config, service: Arc<dyn CompletionService>) -> Result<RagPipeline> {
    let embedder = create_embedder(&cfg.embedding)?;
    let store = open_store(&cfg.store, embedder).await?;
    let generator = AnswerGenerator::new(service, &cfg.llm.model, &cfg.llm.fallback_model);
    Ok(RagPipeline::new(store, cfg.chunking.chunker()?, generator).with_top_k(cfg.retrieval.top_k))
}

/// Connect to the LLM first so a missing key fails before any model loads.
async fn prepare(cfg: &Config, no_ingest: bool) -> Result<RagPipeline> {
    let client = OpenAiCompatClient::from_config(&cfg.llm)?;
    let pipeline = build_pipeline(cfg, Arc::new(client)).await?;

    if no_ingest {
        let count = pipeline.store().count().await?;
        if count == 0 {
            tracing::warn!(
                backend = pipeline.store().backend(),
                "index is empty; run without --no-ingest"
            );
        }
    } else {
        pipeline.ingest_directory(&cfg.data.dir).await?;
    }
    Ok(pipeline)
}

async fn run_ingest(cfg: &Config, dry_run: bool) -> Result<()> {
    let chunker = cfg.chunking.chunker()?;

    if dry_run {
        let report = ingest::dry_run(&chunker, &cfg.data.dir)?;
        println!("Dry run: {}", cfg.data.dir.display());
        println!("  documents: {}", report.documents);
        println!(
            "  chunks:    {} (size {}, overlap {})",
            report.chunks,
            chunker.size(),
            chunker.overlap()
        );
        return Ok(());
    }

    let embedder = create_embedder(&cfg.embedding)?;
    let store = open_store(&cfg.store, embedder).await?;
    let report = ingest::ingest_directory(store.as_ref(), &chunker, &cfg.data.dir).await?;
    println!(
        "Ingested {} documents as {} chunks into the {} store ({} entries total).",
        report.documents,
        report.chunks,
        store.backend(),
        store.count().await?
    );
    Ok(())
}

async fn run_query(
    cfg: &Config,
    question: &str,
    basic: bool,
    json: bool,
    no_ingest: bool,
) -> Result<()> {
    let prompts = load_prompts(cfg)?;
    let pipeline = prepare(cfg, no_ingest).await?;
    let template = if basic {
        &prompts.baseline
    } else {
        &prompts.primary
    };

    let result = pipeline.query(question, template).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.answer);
    println!("\n--- Retrieved Context Sources ---");
    for (i, chunk) in result.context.iter().enumerate() {
        println!("[{}] ...{}...", i + 1, shell::preview(chunk));
    }
    Ok(())
}

async fn run_models(cfg: &Config) -> Result<()> {
    let service: Arc<dyn CompletionService> =
        Arc::new(OpenAiCompatClient::from_config(&cfg.llm)?);
    let mut models = service.list_models().await?;
    models.sort();
    for id in &models {
        println!("{}", id);
    }

    let generator = AnswerGenerator::new(service, &cfg.llm.model, &cfg.llm.fallback_model);
    println!(
        "\nRequested: {}\nResolved:  {}",
        generator.requested_model(),
        generator.resolved_model().await
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => run_ingest(&cfg, dry_run).await?,
        Commands::Query {
            question,
            basic,
            json,
            no_ingest,
        } => run_query(&cfg, &question, basic, json, no_ingest).await?,
        Commands::Chat { no_ingest } => {
            let prompts = load_prompts(&cfg)?;
            let pipeline = prepare(&cfg, no_ingest).await?;
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            shell::run_chat(&pipeline, &prompts, stdin.lock(), &mut stdout).await?;
            stdout.flush()?;
        }
        Commands::Eval { no_ingest } => {
            let prompts = load_prompts(&cfg)?;
            let pipeline = prepare(&cfg, no_ingest).await?;
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            eval::run_eval(
                &pipeline,
                &prompts.primary,
                &EVAL_CASES,
                stdin.lock(),
                &mut stdout,
            )
            .await?;
            stdout.flush()?;
        }
        Commands::Models => run_models(&cfg).await?,
    }

    Ok(())
}
