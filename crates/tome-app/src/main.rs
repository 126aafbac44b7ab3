//! Tome application binary - composition root.
//!
//! Ties together the Tome crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Build the document store (load the persisted index, or ingest)
//! 3. Build the generation client
//! 4. Run the conversation loop over stdin/stdout

use std::io::Write as _;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use tome_chat::{is_exit_command, ChatError, FragmentSink, Orchestrator, SinkFlow, TranscriptWriter};
use tome_core::TomeConfig;
use tome_llm::OpenAiGenerator;
use tome_retrieval::{DocumentStore, OpenAiEmbedding};

mod cli;
use cli::CliArgs;

/// Sink that prints fragments to stdout as they arrive, with a blank line
/// after each completed answer.
struct StdoutSink;

impl FragmentSink for StdoutSink {
    fn on_fragment(&mut self, text: &str) -> SinkFlow {
        print!("{text}");
        let _ = std::io::stdout().flush();
        SinkFlow::Continue
    }

    fn on_complete(&mut self) {
        println!("\n");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first so the log level default can come from it.
    let config_path = args.resolve_config_path();
    let config = TomeConfig::load_or_default(&config_path);

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Tome v{}", env!("CARGO_PKG_VERSION"));

    let api_key = std::env::var(&config.llm.api_key_env).map_err(|_| {
        format!(
            "API key not found: set the {} environment variable",
            config.llm.api_key_env
        )
    })?;

    // Document store: load the persisted index or ingest the folder.
    let docs_dir = args.resolve_docs_dir(&config.documents.folder);
    let index_path = args
        .index_path
        .clone()
        .unwrap_or_else(|| config.index.resolve(&docs_dir));
    tracing::info!(
        docs = %docs_dir.display(),
        index = %index_path.display(),
        "Opening document store"
    );

    let embedder = OpenAiEmbedding::new(
        config.llm.base_url.clone(),
        config.llm.embedding_model.clone(),
        api_key.clone(),
        config.llm.embedding_dimensions,
    )?;
    let store = DocumentStore::open(
        &docs_dir,
        &index_path,
        config.documents.chunk_size,
        config.documents.chunk_overlap,
        Box::new(embedder),
    )
    .await?;
    tracing::info!(chunks = store.chunk_count(), "Document store ready");

    let generator = Arc::new(OpenAiGenerator::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        api_key,
    )?);

    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    let mut orchestrator = Orchestrator::new(Arc::new(store), generator, top_k);
    if !config.general.transcript_path.is_empty() {
        orchestrator =
            orchestrator.with_transcript(TranscriptWriter::new(&config.general.transcript_path));
    }

    run_conversation(&mut orchestrator).await?;
    Ok(())
}

/// Read questions from stdin until EOF or the exit sentinel.
async fn run_conversation(
    orchestrator: &mut Orchestrator,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut sink = StdoutSink;

    loop {
        print!("Input: ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        match orchestrator.ask(question, &mut sink).await {
            Ok(_) => {}
            Err(err @ ChatError::Upstream { .. }) => {
                // Turn-level failure: state was rolled back, keep going.
                tracing::error!(error = %err, "Turn failed");
                eprintln!("Sorry, that question could not be answered: {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::info!("Conversation ended");
    Ok(())
}
