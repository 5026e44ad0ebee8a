//! Core traits and types for Simple RAG
//!
//! This crate defines the fundamental traits and types used across the system.
//! It provides capability-facing interfaces for language models, embedding models,
//! vector stores and text extractors, making the pipelines test-friendly and extensible.

pub mod llm;
pub mod embedding;
pub mod vector_store;
pub mod extractor;
pub mod retry;
pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use llm::{LLMProvider, GenerationConfig};
pub use embedding::{EmbeddingProvider, cosine_similarity};
pub use vector_store::VectorStore;
pub use extractor::{TextExtractor, DocumentType};
pub use retry::with_retry;
pub use types::*;
