//! Retrieval-augmented generation pipelines for Simple RAG
//!
//! This crate provides document ingestion, vector store backends, result
//! post-processing and the chat pipeline that ties them together.

pub mod config;
pub mod splitter;
pub mod extractor;
pub mod embedding;
pub mod vector_store;
pub mod postprocess;
pub mod sentences;
pub mod ledger;
pub mod ingestion;
pub mod uploads;
pub mod chat;
pub mod offline;

#[cfg(test)]
mod tests;

pub use config::{PipelineConfig, VectorStoreKind, PineconeConfig, QdrantConfig};
pub use splitter::TextSplitter;
pub use extractor::{ExtractorSet, ImageOcr, TesseractOcr, PdfExtractor, PlainTextExtractor, MarkdownExtractor, HtmlExtractor};
pub use embedding::HashEmbedder;
pub use vector_store::{LocalVectorStore, PineconeVectorStore, QdrantVectorStore};
pub use postprocess::{NodePostprocessor, QueryBundle, RelevanceTrimmer, DuplicateRemover};
pub use ledger::FilenameLedger;
pub use ingestion::{IngestionPipeline, IngestStatus, Upload};
pub use uploads::{UploadStore, Uploader, UploadOutcome};
pub use chat::{ChatPipeline, ChatSession, ChatStage, ChatResponse, FALLBACK_ANSWER, GREETING};
pub use offline::ExtractiveResponder;
pub use sentences::SentenceSplitter;

// Re-export core types for convenience
pub use srag_core::{
    EmbeddingProvider, LLMProvider, VectorStore, TextExtractor,
    ScoredResult, ConversationTurn, MetadataFilter,
    Error, Result,
};
