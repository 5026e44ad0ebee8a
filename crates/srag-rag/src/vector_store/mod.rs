//! Vector store backends

mod local;
mod pinecone;
mod qdrant;

use std::sync::Arc;

use srag_core::{Result, VectorStore};

use crate::config::{PineconeConfig, PipelineConfig, QdrantConfig, VectorStoreKind};

pub use local::LocalVectorStore;
pub use pinecone::PineconeVectorStore;
pub use qdrant::QdrantVectorStore;

/// Build the configured backend from the environment
pub async fn from_env(kind: VectorStoreKind, pipeline: &PipelineConfig) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match kind {
        VectorStoreKind::Pinecone => {
            let mut config = PineconeConfig::from_env()?;
            config.retry = pipeline.retry.clone();
            Arc::new(PineconeVectorStore::new(config)?)
        }
        VectorStoreKind::Qdrant => {
            let mut config = QdrantConfig::from_env()?;
            config.retry = pipeline.retry.clone();
            Arc::new(QdrantVectorStore::new(config).await?)
        }
        VectorStoreKind::Local => Arc::new(LocalVectorStore::open(pipeline.local_index_path()).await?),
    };

    tracing::info!(backend = ?kind, index = store.index_name(), "vector store ready");
    Ok(store)
}
