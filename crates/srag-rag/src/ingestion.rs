//! Document ingestion: extract, split, embed and index an upload
//!
//! [`IngestionPipeline::ingest`] returns a lazy stream of [`IngestStatus`].
//! Each status is yielded before the step it announces runs, and nothing
//! runs unless the stream is polled.

use chrono::{DateTime, Local};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::sync::Arc;

use srag_core::{
    Chunk, DocumentType, EmbeddedChunk, EmbeddingProvider, Error, Result, VectorStore,
};

use crate::config::PipelineConfig;
use crate::extractor::ExtractorSet;
use crate::splitter::TextSplitter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Progress of one ingestion run
#[derive(Debug, Clone, PartialEq)]
pub enum IngestStatus {
    Started { at: DateTime<Local> },
    Extracting { document_type: DocumentType, with_images: bool },
    Splitting,
    Embedding,
    Indexing,
    Completed { at: DateTime<Local>, chunks: usize },
    Failed { error: String },
}

impl IngestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestStatus::Completed { .. } | IngestStatus::Failed { .. })
    }

    /// Variant name without payload, for logs and assertions
    pub fn kind(&self) -> &'static str {
        match self {
            IngestStatus::Started { .. } => "started",
            IngestStatus::Extracting { .. } => "extracting",
            IngestStatus::Splitting => "splitting",
            IngestStatus::Embedding => "embedding",
            IngestStatus::Indexing => "indexing",
            IngestStatus::Completed { .. } => "completed",
            IngestStatus::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStatus::Started { at } => {
                write!(f, "🎬 Ingestion started at {}", at.format(TIMESTAMP_FORMAT))
            }
            IngestStatus::Extracting { document_type, with_images: false } => {
                write!(f, "🟡 Extracting text from {}...", document_type)
            }
            IngestStatus::Extracting { document_type, with_images: true } => {
                write!(f, "🟡 Extracting text from {}, including images...", document_type)
            }
            IngestStatus::Splitting => write!(f, "🟡 Splitting text into chunks/nodes..."),
            IngestStatus::Embedding => write!(f, "🟡 Generating embeddings..."),
            IngestStatus::Indexing => write!(f, "🟡 Indexing..."),
            IngestStatus::Completed { at, .. } => {
                write!(f, "✅ Ingestion completed at {}", at.format(TIMESTAMP_FORMAT))
            }
            IngestStatus::Failed { error } => write!(f, "❌ Error: {}", error),
        }
    }
}

/// Raw bytes of an uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Where the raw bytes were persisted; recorded on every chunk.
    pub source: String,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            source: file_name.clone(),
            file_name,
            bytes,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Turns uploads into embedded chunks in a vector store
pub struct IngestionPipeline {
    extractors: ExtractorSet,
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate()?;
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;

        Ok(Self {
            extractors: ExtractorSet::from_config(&config),
            splitter,
            embedder,
            store,
            config,
        })
    }

    pub fn with_extractors(mut self, extractors: ExtractorSet) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest one upload, reporting progress as a stream
    pub fn ingest(&self, upload: Upload) -> BoxStream<'_, IngestStatus> {
        let run = IngestRun {
            pipeline: self,
            upload,
            document_type: DocumentType::PlainText,
            step: Step::Validate,
        };

        stream::unfold(run, |mut run| async move {
            let status = run.advance().await?;
            Some((status, run))
        })
        .boxed()
    }

    fn validate(&self, upload: &Upload) -> Result<DocumentType> {
        if upload.bytes.is_empty() {
            return Err(Error::InvalidInput(format!("{} is empty", upload.file_name)));
        }

        let document_type = DocumentType::from_filename(&upload.file_name).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{} is not a supported file type (pdf, txt, md, html)",
                upload.file_name
            ))
        })?;

        if !document_type.matches_content(&upload.bytes) {
            return Err(Error::InvalidInput(format!(
                "{} does not look like a {} file",
                upload.file_name, document_type
            )));
        }
        if !self.extractors.supports(document_type) {
            return Err(Error::InvalidInput(format!(
                "no extractor configured for {} files",
                document_type
            )));
        }

        Ok(document_type)
    }

    async fn extract(&self, document_type: DocumentType, bytes: &[u8]) -> Result<String> {
        let extractor = self.extractors.find(document_type).ok_or_else(|| {
            Error::Extraction(format!("no extractor for {} files", document_type))
        })?;
        extractor.extract(bytes).await
    }

    async fn embed(&self, chunks: Vec<Chunk>) -> Result<Vec<EmbeddedChunk>> {
        let mut embedded = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            embedded.extend(batch.iter().cloned().zip(vectors).map(|(chunk, embedding)| {
                EmbeddedChunk { chunk, embedding }
            }));
        }

        Ok(embedded)
    }

    async fn index(&self, embedded: Vec<EmbeddedChunk>) -> Result<usize> {
        let mut written = 0;
        for batch in embedded.chunks(self.config.upsert_batch_size) {
            written += self.store.upsert(batch.to_vec()).await?;
        }
        Ok(written)
    }
}

enum Step {
    Validate,
    AnnounceExtract,
    Extract,
    Split(String),
    Embed(Vec<Chunk>),
    Index(Vec<EmbeddedChunk>),
    Finished,
}

struct IngestRun<'a> {
    pipeline: &'a IngestionPipeline,
    upload: Upload,
    document_type: DocumentType,
    step: Step,
}

impl IngestRun<'_> {
    /// Run the pending step and return the next status, `None` once finished
    async fn advance(&mut self) -> Option<IngestStatus> {
        let file_name = self.upload.file_name.clone();

        let outcome = match std::mem::replace(&mut self.step, Step::Finished) {
            Step::Validate => self.pipeline.validate(&self.upload).map(|document_type| {
                tracing::info!(file = %file_name, %document_type, "ingestion started");
                self.document_type = document_type;
                self.step = Step::AnnounceExtract;
                IngestStatus::Started { at: Local::now() }
            }),
            Step::AnnounceExtract => {
                self.step = Step::Extract;
                Ok(IngestStatus::Extracting {
                    document_type: self.document_type,
                    with_images: self.pipeline.extractors.reads_images(self.document_type),
                })
            }
            Step::Extract => self
                .pipeline
                .extract(self.document_type, &self.upload.bytes)
                .await
                .map(|text| {
                    tracing::info!(file = %file_name, chars = text.chars().count(), "text extracted");
                    self.step = Step::Split(text);
                    IngestStatus::Splitting
                }),
            Step::Split(text) => {
                let chunks = self
                    .pipeline
                    .splitter
                    .split_document(&text, &file_name, &self.upload.source);
                if chunks.is_empty() {
                    Err(Error::Ingestion(format!("no text could be extracted from {}", file_name)))
                } else {
                    tracing::info!(file = %file_name, chunks = chunks.len(), "text split");
                    self.step = Step::Embed(chunks);
                    Ok(IngestStatus::Embedding)
                }
            }
            Step::Embed(chunks) => self.pipeline.embed(chunks).await.map(|embedded| {
                tracing::info!(file = %file_name, chunks = embedded.len(), "chunks embedded");
                self.step = Step::Index(embedded);
                IngestStatus::Indexing
            }),
            Step::Index(embedded) => self.pipeline.index(embedded).await.map(|written| {
                tracing::info!(file = %file_name, written, "ingestion completed");
                IngestStatus::Completed {
                    at: Local::now(),
                    chunks: written,
                }
            }),
            Step::Finished => return None,
        };

        Some(outcome.unwrap_or_else(|e| {
            tracing::error!(file = %file_name, error = %e, "ingestion failed");
            IngestStatus::Failed {
                error: e.to_string(),
            }
        }))
    }
}
