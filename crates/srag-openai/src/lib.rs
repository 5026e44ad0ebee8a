//! OpenAI integration for Simple RAG
//!
//! This crate provides the OpenAI implementation of the EmbeddingProvider and
//! LLMProvider traits.

mod client;
mod config;


pub use client::OpenAIClient;
pub use config::OpenAIConfig;

// Re-export core types for convenience
pub use srag_core::{
    EmbeddingProvider, LLMProvider, GenerationConfig, RetryConfig, Error, Result,
};
