//! In-memory vector store, optionally persisted as JSON

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use srag_core::{
    cosine_similarity, EmbeddedChunk, Error, MetadataFilter, Result, ScoredResult, VectorStore,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRecords {
    records: Vec<EmbeddedChunk>,
}

/// Local in-memory vector store implementation
pub struct LocalVectorStore {
    index_name: String,
    records: Arc<RwLock<HashMap<String, EmbeddedChunk>>>,
    persist_path: Option<PathBuf>,
}

impl LocalVectorStore {
    /// Create a new, empty, memory-only store
    pub fn new() -> Self {
        Self {
            index_name: "local".to_string(),
            records: Arc::new(RwLock::new(HashMap::new())),
            persist_path: None,
        }
    }

    /// Open a store backed by a JSON file, loading it if it exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = HashMap::new();

        if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            let stored: StoredRecords = serde_json::from_str(&content)?;
            for record in stored.records {
                records.insert(record.chunk.id.clone(), record);
            }
        }

        Ok(Self {
            index_name: path.display().to_string(),
            records: Arc::new(RwLock::new(records)),
            persist_path: Some(path),
        })
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        let json = {
            let records = self
                .records
                .read()
                .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
            let mut stored = StoredRecords {
                records: records.values().cloned().collect(),
            };
            stored.records.sort_by(|a, b| a.chunk.id.cmp(&b.chunk.id));
            serde_json::to_string(&stored)?
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

impl Default for LocalVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize> {
        let written = chunks.len();
        {
            let mut records = self
                .records
                .write()
                .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
            for chunk in chunks {
                records.insert(chunk.chunk.id.clone(), chunk);
            }
        }

        self.persist().await?;
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredResult>> {
        let records = self
            .records
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let mut results: Vec<ScoredResult> = records
            .values()
            .filter(|record| filters.iter().all(|f| f.matches(&record.chunk.metadata)))
            .map(|record| {
                ScoredResult::new(
                    record.chunk.id.clone(),
                    record.chunk.text.clone(),
                    cosine_similarity(vector, &record.embedding),
                    record.chunk.metadata.clone(),
                )
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(top_k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(records.len())
    }

    fn index_name(&self) -> &str {
        &self.index_name
    }
}
