//! Vector store trait

use async_trait::async_trait;

use crate::types::{EmbeddedChunk, MetadataFilter, ScoredResult};
use crate::Result;

/// Trait for vector stores (e.g., Pinecone, Qdrant, etc.)
///
/// A store instance is bound to one index/collection. Every record carries
/// its chunk metadata, so queries can be narrowed to a single source file.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records, returning how many were written
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize>;

    /// Nearest neighbours of `vector`, best first. All `filters` must match.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredResult>>;

    /// Get the total number of records
    async fn count(&self) -> Result<usize>;

    /// Name of the index/collection this store writes to
    fn index_name(&self) -> &str;
}
