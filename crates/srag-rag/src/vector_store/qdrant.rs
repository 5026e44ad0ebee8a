//! Qdrant vector store

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointId,
    PointStruct, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use std::collections::HashMap;

use srag_core::{
    ChunkMetadata, EmbeddedChunk, Error, MetadataFilter, Result, RetryConfig, ScoredResult,
    VectorStore, content_hash, with_retry,
};

use crate::config::QdrantConfig;

/// Qdrant-backed vector store bound to one collection
pub struct QdrantVectorStore {
    client: Qdrant,
    collection_name: String,
    retry: RetryConfig,
}

// gRPC status codes
const CODE_CANCELLED: i32 = 1;
const CODE_DEADLINE_EXCEEDED: i32 = 4;
const CODE_PERMISSION_DENIED: i32 = 7;
const CODE_RESOURCE_EXHAUSTED: i32 = 8;
const CODE_ABORTED: i32 = 10;
const CODE_UNAVAILABLE: i32 = 14;
const CODE_UNAUTHENTICATED: i32 = 16;

impl QdrantVectorStore {
    /// Connect and create the collection if it does not exist yet
    pub async fn new(config: QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(config.retry.request_timeout)
            .build()
            .map_err(map_qdrant_error)?;

        let store = Self {
            client,
            collection_name: config.collection_name.clone(),
            retry: config.retry.clone(),
        };
        with_retry(&store.retry, "qdrant ensure collection", || {
            store.ensure_collection(config.dimensions)
        })
        .await?;
        Ok(store)
    }

    pub async fn from_env() -> Result<Self> {
        Self::new(QdrantConfig::from_env()?).await
    }

    async fn ensure_collection(&self, dimensions: u64) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .map_err(map_qdrant_error)?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection_name)
                        .vectors_config(VectorParamsBuilder::new(dimensions, Distance::Cosine)),
                )
                .await
                .map_err(map_qdrant_error)?;
            tracing::info!(collection = %self.collection_name, dimensions, "created qdrant collection");
        }

        Ok(())
    }

    async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(map_qdrant_error)?;
        Ok(())
    }

    async fn perform_query(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredResult>> {
        let mut request = QueryPointsBuilder::new(&self.collection_name)
            .query(vector.to_vec())
            .limit(top_k as u64)
            .with_payload(true);

        if !filters.is_empty() {
            request = request.filter(Filter::must(
                filters
                    .iter()
                    .map(|f| Condition::matches(f.key.clone(), f.value.clone())),
            ));
        }

        let response = self
            .client
            .query(request)
            .await
            .map_err(map_qdrant_error)?;

        Ok(response.result.into_iter().map(from_scored_point).collect())
    }

    async fn count_points(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name).exact(true))
            .await
            .map_err(map_qdrant_error)?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize> {
        let written = chunks.len();
        let points: Vec<PointStruct> = chunks.into_iter().map(to_point).collect();

        with_retry(&self.retry, "qdrant upsert", || self.upsert_points(points.clone())).await?;

        tracing::debug!(collection = %self.collection_name, written, "upserted points");
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredResult>> {
        with_retry(&self.retry, "qdrant query", || {
            self.perform_query(vector, top_k, filters)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        with_retry(&self.retry, "qdrant count", || self.count_points()).await
    }

    fn index_name(&self) -> &str {
        &self.collection_name
    }
}

fn map_qdrant_error(err: QdrantError) -> Error {
    match err {
        QdrantError::ResponseError { status } => status_error(status.code() as i32, status.message()),
        other => Error::VectorStore(format!("Qdrant error: {}", other)),
    }
}

/// Sort a gRPC failure into the retryable and permanent error kinds
fn status_error(code: i32, message: &str) -> Error {
    match code {
        CODE_UNAVAILABLE | CODE_CANCELLED | CODE_ABORTED => {
            Error::Network(format!("Qdrant unavailable: {}", message))
        }
        CODE_DEADLINE_EXCEEDED => Error::Timeout(format!("Qdrant deadline exceeded: {}", message)),
        CODE_RESOURCE_EXHAUSTED => Error::RateLimited(format!("Qdrant: {}", message)),
        CODE_UNAUTHENTICATED | CODE_PERMISSION_DENIED => {
            Error::Authentication(format!("Qdrant: {}", message))
        }
        _ => Error::VectorStore(format!("Qdrant error (code {}): {}", code, message)),
    }
}

fn to_point(record: EmbeddedChunk) -> PointStruct {
    let EmbeddedChunk { chunk, embedding } = record;
    let metadata = chunk.metadata;

    let mut payload = Payload::new();
    payload.insert("content_hash", content_hash(&chunk.text));
    payload.insert("text", chunk.text);
    payload.insert("file_name", metadata.file_name);
    payload.insert("node_id", metadata.node_id);
    payload.insert("source", metadata.source);
    payload.insert("chunk_index", metadata.chunk_index as i64);
    payload.insert("total_chunks", metadata.total_chunks as i64);

    PointStruct::new(chunk.id, embedding, payload)
}

fn from_scored_point(point: ScoredPoint) -> ScoredResult {
    let payload = point.payload;
    let metadata = ChunkMetadata {
        file_name: string_value(&payload, "file_name"),
        node_id: string_value(&payload, "node_id"),
        source: string_value(&payload, "source"),
        chunk_index: integer_value(&payload, "chunk_index"),
        total_chunks: integer_value(&payload, "total_chunks"),
    };

    ScoredResult::new(
        point_id_to_string(point.id),
        string_value(&payload, "text"),
        point.score,
        metadata,
    )
}

fn string_value(payload: &HashMap<String, Value>, key: &str) -> String {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::StringValue(s)),
        }) => s.clone(),
        _ => String::new(),
    }
}

fn integer_value(payload: &HashMap<String, Value>, key: &str) -> usize {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::IntegerValue(n)),
        }) => (*n).max(0) as usize,
        _ => 0,
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}
