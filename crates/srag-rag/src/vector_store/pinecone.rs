//! Pinecone vector store over the REST data plane

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

use srag_core::{
    ChunkMetadata, EmbeddedChunk, Error, MetadataFilter, Result, ScoredResult, VectorStore,
    content_hash, with_retry,
};

use crate::config::PineconeConfig;

const API_VERSION: &str = "2024-07";
const UPSERT_BATCH_SIZE: usize = 100;

/// Pinecone-backed vector store bound to one index and namespace
pub struct PineconeVectorStore {
    config: PineconeConfig,
    client: Client,
    host: OnceCell<String>,
}

#[derive(Debug, Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: std::collections::HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
}

impl PineconeVectorStore {
    pub fn new(config: PineconeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Configuration("Pinecone API key is empty".to_string()));
        }
        url::Url::parse(&config.control_plane_url).map_err(|e| {
            Error::Configuration(format!(
                "invalid Pinecone control plane url '{}': {}",
                config.control_plane_url, e
            ))
        })?;

        let client = Client::builder()
            .timeout(config.retry.request_timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let host = OnceCell::new();
        if let Some(index_host) = &config.index_host {
            host.set(normalize_host(index_host))
                .map_err(|e| Error::Configuration(e.to_string()))?;
        }

        Ok(Self {
            config,
            client,
            host,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(PineconeConfig::from_env()?)
    }

    /// Data-plane base url, looked up once through the control plane
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                with_retry(&self.config.retry, "pinecone describe index", || {
                    self.describe_index()
                })
                .await
            })
            .await?;
        Ok(host.as_str())
    }

    async fn describe_index(&self) -> Result<String> {
        let url = format!(
            "{}/indexes/{}",
            self.config.control_plane_url.trim_end_matches('/'),
            self.config.index_name
        );
        let response = self
            .client
            .get(url)
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response, "describe index").await?;
        let description: IndexDescription = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        tracing::debug!(index = %self.config.index_name, host = %description.host, "resolved pinecone host");
        Ok(normalize_host(&description.host))
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}", self.host().await?, path);
        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response, path).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    async fn upsert_batch(&self, batch: &[EmbeddedChunk]) -> Result<usize> {
        let request = UpsertRequest {
            vectors: batch
                .iter()
                .map(|record| PineconeVector {
                    id: &record.chunk.id,
                    values: &record.embedding,
                    metadata: metadata_to_json(&record.chunk.text, &record.chunk.metadata),
                })
                .collect(),
            namespace: &self.config.namespace,
        };

        let response: UpsertResponse = self.post("vectors/upsert", &request).await?;
        Ok(response.upserted_count)
    }

    async fn perform_query(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredResult>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: &self.config.namespace,
            filter: filter_to_json(filters),
        };

        let response: QueryResponse = self.post("query", &request).await?;
        Ok(response.matches.into_iter().map(match_to_result).collect())
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize> {
        let mut written = 0;
        for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
            written += with_retry(&self.config.retry, "pinecone upsert", || {
                self.upsert_batch(batch)
            })
            .await?;
        }
        tracing::debug!(index = %self.config.index_name, written, "upserted vectors");
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredResult>> {
        with_retry(&self.config.retry, "pinecone query", || {
            self.perform_query(vector, top_k, filters)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        let body = json!({});
        let stats: IndexStats = with_retry(&self.config.retry, "pinecone stats", || {
            self.post("describe_index_stats", &body)
        })
        .await?;

        if self.config.namespace.is_empty() {
            return Ok(stats.total_vector_count);
        }
        Ok(stats
            .namespaces
            .get(&self.config.namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0))
    }

    fn index_name(&self) -> &str {
        &self.config.index_name
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn metadata_to_json(text: &str, metadata: &ChunkMetadata) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("file_name".to_string(), json!(metadata.file_name));
    map.insert("text".to_string(), json!(text));
    map.insert("node_id".to_string(), json!(metadata.node_id));
    map.insert("source".to_string(), json!(metadata.source));
    map.insert("chunk_index".to_string(), json!(metadata.chunk_index));
    map.insert("total_chunks".to_string(), json!(metadata.total_chunks));
    map.insert("content_hash".to_string(), json!(content_hash(text)));
    map
}

fn filter_to_json(filters: &[MetadataFilter]) -> Option<Value> {
    if filters.is_empty() {
        return None;
    }
    let mut clauses = Map::new();
    for filter in filters {
        clauses.insert(filter.key.clone(), json!({ "$eq": filter.value }));
    }
    Some(Value::Object(clauses))
}

fn match_to_result(m: QueryMatch) -> ScoredResult {
    let string_field = |key: &str| {
        m.metadata
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let number_field = |key: &str| {
        m.metadata
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or_default() as usize
    };

    let metadata = ChunkMetadata {
        file_name: string_field("file_name"),
        node_id: string_field("node_id"),
        source: string_field("source"),
        chunk_index: number_field("chunk_index"),
        total_chunks: number_field("total_chunks"),
    };
    let text = string_field("text");

    ScoredResult::new(m.id, text, m.score, metadata)
}

fn map_transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

async fn check_status(response: reqwest::Response, path: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = format!("Pinecone {} request failed with status {}: {}", path, status, body);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(message),
        s if s.is_server_error() => Error::Network(message),
        _ => Error::VectorStore(message),
    })
}
