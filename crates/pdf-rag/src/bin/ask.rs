//! pdf-rag binary: ingest one PDF and answer a question about it
//!
//! Run with: cargo run -p pdf-rag -- --pdf docs/pope.pdf --question "Who is Alexander Pope"
//!
//! `pdf-rag.example.toml` next to this crate's manifest carries the demo reader
//! settings (skip the first page, strip three footer lines per page).

use anyhow::Context;
use clap::Parser;
use pdf_rag::{RagConfig, RagPipeline};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pdf-rag", version, about = "Ask a question about a PDF", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// PDF to ingest (overrides pdf.path)
    #[arg(long, env = "PDF_RAG_PDF")]
    pdf: Option<PathBuf>,

    /// Question to ask (overrides prompt.question)
    #[arg(short, long, env = "PDF_RAG_QUESTION")]
    question: Option<String>,

    /// SQLite vector store file (overrides store.path)
    #[arg(long, env = "PDF_RAG_STORE")]
    store: Option<PathBuf>,

    /// API key for the openai provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RagConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RagConfig::default(),
    };

    if let Some(pdf) = cli.pdf {
        config.pdf.path = pdf;
    }
    if let Some(question) = cli.question {
        config.prompt.question = question;
    }
    if let Some(store) = cli.store {
        config.store.path = store;
    }
    if cli.openai_api_key.is_some() {
        config.openai.api_key = cli.openai_api_key;
    }

    config.validate().context("invalid configuration")?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - PDF: {}", config.pdf.path.display());
    tracing::info!(
        "  - Embeddings: {:?} ({})",
        config.embeddings.provider,
        config.embeddings.model
    );
    tracing::info!("  - Chat: {:?} ({})", config.chat.provider, config.chat.model);
    tracing::info!("  - Chunk size: {} tokens, top-k {}", config.chunking.chunk_size, config.retrieval.top_k);

    let mut pipeline = RagPipeline::from_config(&config).context("building pipeline")?;

    if !pipeline.health_check().await.context("checking backends")? {
        tracing::warn!("Some backends are not reachable; the run will likely fail");
        tracing::warn!("  Start Ollama with `ollama serve` and pull the configured models");
    }

    let question = config.prompt.question.clone();
    let answer = pipeline
        .run(&question)
        .await
        .with_context(|| format!("pipeline failed during {}", pipeline.stage()))?;

    println!("Q: {}", question);
    println!("A: {}", answer.text);
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!("  - {} ({:.3})", source.chunk.source_label(), source.similarity);
        }
    }

    Ok(())
}
