//! StudyMate command line: ingest documents and ask a question
//!
//! Run with: cargo run -p studymate-rag --bin studymate -- --file notes.pdf --question "..."

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use studymate_rag::{
    generation::referenced_citations, ApiToken, CorpusManager, Document, DocumentStatus,
    RagConfig, SynthesisStrategy, VectorIndex,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "studymate", version, about = "Ask questions about your study documents")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Document to ingest (repeatable)
    #[arg(long = "file", short = 'f')]
    files: Vec<PathBuf>,

    /// Question to answer
    #[arg(long, short = 'q')]
    question: Option<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Answer strategy: extractive, generative or conversational
    #[arg(long)]
    strategy: Option<SynthesisStrategy>,

    /// Load a saved index before ingesting
    #[arg(long)]
    load_index: Option<PathBuf>,

    /// Save the index after ingesting
    #[arg(long)]
    save_index: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studymate_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RagConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RagConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.synthesis.strategy = strategy;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedder: {}", config.embeddings.describe());
    tracing::info!("  - Strategy: {:?}", config.synthesis.strategy);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);

    let token = std::env::var("STUDYMATE_API_TOKEN").ok().map(ApiToken::new);
    let k = args.k.unwrap_or(config.retrieval.default_k);
    let chunking = config.chunking;
    let index_config = config.index.clone();
    let manager = CorpusManager::from_config(config, token)?;

    if let Some(path) = &args.load_index {
        let index = VectorIndex::load(path, index_config)
            .with_context(|| format!("failed to load index from {}", path.display()))?;
        manager.restore(index).await?;
    }

    if !args.files.is_empty() {
        let mut documents = Vec::with_capacity(args.files.len());
        for path in &args.files {
            let content = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            documents.push(Document::new(id, content));
        }

        let report = manager.ingest(documents, chunking).await?;
        for outcome in &report.documents {
            match &outcome.status {
                DocumentStatus::Indexed {
                    chunks_added,
                    skipped_chunks,
                    empty_text,
                    ..
                } => {
                    let mut line = format!("  ok    {} ({} chunks)", outcome.document_id, chunks_added);
                    if !skipped_chunks.is_empty() {
                        line.push_str(&format!(", {} skipped", skipped_chunks.len()));
                    }
                    if *empty_text {
                        line.push_str(", no extractable text");
                    }
                    println!("{}", line);
                }
                DocumentStatus::Failed { message, .. } => {
                    println!("  fail  {}: {}", outcome.document_id, message);
                }
            }
        }
        println!("{} text chunks indexed", manager.stats().chunks);
    }

    if let Some(path) = &args.save_index {
        if let Some(index) = manager.current_index() {
            index
                .save(path)
                .with_context(|| format!("failed to save index to {}", path.display()))?;
            println!("Index saved to {}", path.display());
        }
    }

    let Some(question) = args.question else {
        return Ok(());
    };

    let result = manager.ask(&question, k).await?;
    let citations = result.citations();
    let cited = referenced_citations(result.answer.text(), &citations);

    println!("\nAnswer:\n{}\n", result.answer);
    if !citations.is_empty() {
        println!("Sources:");
        for (i, citation) in citations.iter().enumerate() {
            let marker = if cited.contains(&i) { "*" } else { " " };
            println!(
                "{}{}. {} (score {:.3})",
                marker,
                i + 1,
                citation.format_inline(),
                citation.score
            );
            println!("    {}", citation.snippet);
        }
    }

    Ok(())
}
