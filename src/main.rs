use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

// Import from our modular crates
use srag_core::{EmbeddingProvider, LLMProvider, VectorStore};
use srag_openai::{OpenAIClient, OpenAIConfig};
use srag_rag::{
    ChatPipeline, ChatSession, ExtractiveResponder, FilenameLedger, HashEmbedder,
    IngestionPipeline, LocalVectorStore, PipelineConfig, UploadOutcome, UploadStore, Uploader,
    VectorStoreKind,
};
use srag_cli::{display_banner, run_chat, ui};

#[derive(Parser)]
#[command(name = "simple-rag")]
#[command(about = "Upload documents and chat with them", long_about = None)]
struct Cli {
    /// Use the hashed embedder, the local store and extractive answers; no network
    #[arg(long, global = true)]
    offline: bool,

    /// Vector store backend: pinecone, qdrant or local (default: SRAG_VECTOR_STORE)
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Tuning {
    /// Characters per chunk
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Chunks retrieved per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Sentence percentile kept by the relevance trimmer (0 to 1)
    #[arg(long, global = true)]
    percentile_cutoff: Option<f32>,

    /// Minimum similarity score of a retrieved chunk
    #[arg(long, global = true)]
    threshold_cutoff: Option<f32>,

    /// Keep chunks that trim down to nothing
    #[arg(long, global = true)]
    keep_empty: bool,

    /// OCR images embedded in PDFs with tesseract
    #[arg(long, global = true)]
    ocr: bool,

    /// Per-request timeout for remote services, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Attempts per remote request
    #[arg(long, global = true)]
    retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a document and ingest it into the vector store
    Upload {
        file: PathBuf,
        /// Ingest again even if the file was uploaded before
        #[arg(long)]
        force: bool,
    },
    /// Chat with the uploaded documents (default)
    Chat {
        /// Only answer from this uploaded file
        #[arg(long)]
        context: Option<String>,
        /// Show the source chunks of each answer
        #[arg(long)]
        cite: bool,
    },
    /// List uploaded files
    Files,
    /// About this app
    About,
}

struct Services {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LLMProvider>,
    store: Arc<dyn VectorStore>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = pipeline_config(&cli.tuning)?;

    match cli.command.unwrap_or(Commands::Chat {
        context: None,
        cite: false,
    }) {
        Commands::About => {
            ui::print_about();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Files => {
            let ledger = FilenameLedger::open(config.ledger_path()).await?;
            ui::print_files(&ledger.filenames().await?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Upload { file, force } => {
            let services = build_services(cli.offline, cli.store.as_deref(), &config).await?;
            upload(&config, services, file, force).await
        }
        Commands::Chat { context, cite } => {
            let connect = || build_services(cli.offline, cli.store.as_deref(), &config);
            chat(&config, connect, context, cite).await
        }
    }
}

fn pipeline_config(tuning: &Tuning) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;

    if let Some(chunk_size) = tuning.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(chunk_overlap) = tuning.chunk_overlap {
        config.chunk_overlap = chunk_overlap;
    }
    if let Some(top_k) = tuning.top_k {
        config.top_k = top_k;
    }
    if let Some(percentile_cutoff) = tuning.percentile_cutoff {
        config.percentile_cutoff = percentile_cutoff;
    }
    if let Some(threshold_cutoff) = tuning.threshold_cutoff {
        config.threshold_cutoff = threshold_cutoff;
    }
    if tuning.keep_empty {
        config.drop_empty = false;
    }
    if tuning.ocr {
        config.ocr = true;
    }
    if let Some(secs) = tuning.timeout_secs {
        config.retry.request_timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = tuning.retries {
        config.retry.max_attempts = retries;
    }

    config.validate()?;
    Ok(config)
}

async fn build_services(offline: bool, store: Option<&str>, config: &PipelineConfig) -> Result<Services> {
    if offline {
        let store = LocalVectorStore::open(config.local_index_path()).await?;
        return Ok(Services {
            embedder: Arc::new(HashEmbedder::default()),
            llm: Arc::new(ExtractiveResponder::new()?),
            store: Arc::new(store),
        });
    }

    let kind = match store {
        Some(name) => VectorStoreKind::from_str(name)
            .with_context(|| format!("unknown vector store '{}'", name))?,
        None => VectorStoreKind::from_env()?,
    };

    let openai_config = OpenAIConfig::from_env()
        .context("OpenAI is not configured; set OPENAI_API_KEY or use --offline")?
        .with_retry(config.retry.clone());
    let openai = Arc::new(OpenAIClient::new(openai_config)?);

    Ok(Services {
        embedder: openai.clone(),
        llm: openai,
        store: srag_rag::vector_store::from_env(kind, config).await?,
    })
}

async fn upload(config: &PipelineConfig, services: Services, file: PathBuf, force: bool) -> Result<ExitCode> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("{} has no file name", file.display()))?;

    let ledger = Arc::new(FilenameLedger::open(config.ledger_path()).await?);
    let pipeline = IngestionPipeline::new(config.clone(), services.embedder, services.store)?;
    let uploader = Uploader::new(UploadStore::new(&config.uploads_dir), ledger, Arc::new(pipeline));

    println!("{} Uploading {}", "⬆️".blue(), file_name.bold());
    let outcome = uploader.upload(&file_name, bytes, force, ui::print_status).await?;
    ui::print_upload_outcome(&file_name, &outcome);

    Ok(match outcome {
        UploadOutcome::Failed { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

/// Services are only connected once there is something to chat about
async fn chat<F, Fut>(
    config: &PipelineConfig,
    connect: F,
    context: Option<String>,
    cite: bool,
) -> Result<ExitCode>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Services>>,
{
    let ledger = FilenameLedger::open(config.ledger_path()).await?;
    let files = ledger.filenames().await?;

    display_banner("Simple RAG");

    if files.is_empty() {
        ui::print_knows_nothing();
        return Ok(ExitCode::SUCCESS);
    }

    let mut session = ChatSession::new();
    session.set_cite_nodes(cite);
    if let Some(file) = context {
        if !files.contains(&file) {
            println!("{} {} has not been uploaded", "⚠️".yellow(), file);
            ui::print_files(&files);
            return Ok(ExitCode::FAILURE);
        }
        session.set_context_file(Some(file));
    }

    let services = connect().await?;
    let pipeline = ChatPipeline::new(config, services.embedder, services.store, services.llm)?;
    run_chat(&pipeline, &ledger, &mut session).await?;
    Ok(ExitCode::SUCCESS)
}
