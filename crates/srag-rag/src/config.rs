//! Pipeline and vector store configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use srag_core::{Error, Result, RetryConfig};

/// Tunables shared by the ingestion and chat pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
    pub upsert_batch_size: usize,
    pub top_k: usize,
    pub percentile_cutoff: f32,
    pub threshold_cutoff: f32,
    /// Drop results whose text is empty after sentence trimming.
    pub drop_empty: bool,
    pub uploads_dir: PathBuf,
    /// Also OCR the images embedded in PDFs
    pub ocr: bool,
    pub ocr_language: String,
    pub tesseract_path: PathBuf,
    /// Timeout and retry policy for remote services
    #[serde(skip)]
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 20,
            embed_batch_size: 100,
            upsert_batch_size: 100,
            top_k: 2,
            percentile_cutoff: 0.5,
            threshold_cutoff: 0.72,
            drop_empty: true,
            uploads_dir: PathBuf::from("uploads"),
            ocr: false,
            ocr_language: "eng".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, with `SRAG_UPLOADS_DIR`, `SRAG_OCR`, `SRAG_OCR_LANG` and
    /// `TESSERACT_PATH` applied if set
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(dir) = env::var("SRAG_UPLOADS_DIR") {
            config.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(value) = env::var("SRAG_OCR") {
            config.ocr = parse_flag("SRAG_OCR", &value)?;
        }
        if let Ok(language) = env::var("SRAG_OCR_LANG") {
            config.ocr_language = language;
        }
        if let Ok(path) = env::var("TESSERACT_PATH") {
            config.tesseract_path = PathBuf::from(path);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk size must be at least 1".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embed_batch_size == 0 || self.upsert_batch_size == 0 {
            return Err(Error::Configuration("batch sizes must be at least 1".to_string()));
        }
        if self.ocr && self.ocr_language.trim().is_empty() {
            return Err(Error::Configuration("OCR language must not be empty".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.percentile_cutoff) {
            return Err(Error::Configuration(format!(
                "percentile cutoff {} is outside [0, 1]",
                self.percentile_cutoff
            )));
        }
        Ok(())
    }

    /// Path of the filename ledger inside the uploads directory
    pub fn ledger_path(&self) -> PathBuf {
        self.uploads_dir.join("filename.log")
    }

    /// Path of the JSON file backing the local vector store
    pub fn local_index_path(&self) -> PathBuf {
        self.uploads_dir.join("local_index.json")
    }
}

/// Which vector store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    Pinecone,
    Qdrant,
    Local,
}

impl VectorStoreKind {
    pub fn from_str(s: &str) -> Option<VectorStoreKind> {
        match s.to_lowercase().as_str() {
            "pinecone" => Some(VectorStoreKind::Pinecone),
            "qdrant" => Some(VectorStoreKind::Qdrant),
            "local" | "memory" => Some(VectorStoreKind::Local),
            _ => None,
        }
    }

    /// Read `SRAG_VECTOR_STORE`, defaulting to Pinecone
    pub fn from_env() -> Result<Self> {
        match env::var("SRAG_VECTOR_STORE") {
            Ok(value) => Self::from_str(&value).ok_or_else(|| {
                Error::Configuration(format!(
                    "unknown SRAG_VECTOR_STORE '{}', expected pinecone, qdrant or local",
                    value
                ))
            }),
            Err(_) => Ok(VectorStoreKind::Pinecone),
        }
    }
}

/// Configuration for the Pinecone vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    pub api_key: String,
    pub environment: String,
    pub index_name: String,
    /// Data-plane host; resolved from the control plane when absent.
    pub index_host: Option<String>,
    pub namespace: String,
    pub control_plane_url: String,
    #[serde(skip)]
    pub retry: RetryConfig,
}

impl PineconeConfig {
    pub const CONTROL_PLANE_URL: &'static str = "https://api.pinecone.io";

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = required_var("PINECONE_API_KEY")?;
        let environment = required_var("PINECONE_ENVIRONMENT")?;
        let index_name = required_var("PINECONE_INDEX_NAME")?;

        let mut config = Self::new(api_key, environment, index_name);
        config.index_host = env::var("PINECONE_INDEX_HOST").ok().filter(|h| !h.is_empty());
        config.namespace = env::var("PINECONE_NAMESPACE").unwrap_or_default();
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String, environment: String, index_name: String) -> Self {
        Self {
            api_key,
            environment,
            index_name,
            index_host: None,
            namespace: String::new(),
            control_plane_url: Self::CONTROL_PLANE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Configuration for the Qdrant vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
    pub dimensions: u64,
    #[serde(skip)]
    pub retry: RetryConfig,
}

impl QdrantConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            url: env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string()),
            api_key: env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty()),
            collection_name: env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "simple_rag".to_string()),
            dimensions: match env::var("QDRANT_DIMENSIONS") {
                Ok(value) => value.parse().map_err(|_| {
                    Error::Configuration(format!("QDRANT_DIMENSIONS '{}' is not a number", value))
                })?,
                Err(_) => 1536,
            },
            retry: RetryConfig::default(),
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Configuration(format!("{} '{}' is not a boolean", name, value))),
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::Configuration(format!("{} environment variable not found", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger_path(), PathBuf::from("uploads/filename.log"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let config = PipelineConfig {
            chunk_size: 20,
            chunk_overlap: 20,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_percentile_cutoff_range() {
        let config = PipelineConfig {
            percentile_cutoff: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("SRAG_OCR", "true").unwrap());
        assert!(parse_flag("SRAG_OCR", " 1 ").unwrap());
        assert!(!parse_flag("SRAG_OCR", "off").unwrap());
        assert!(parse_flag("SRAG_OCR", "maybe").is_err());
    }

    #[test]
    fn test_vector_store_kind_from_str() {
        assert_eq!(VectorStoreKind::from_str("Pinecone"), Some(VectorStoreKind::Pinecone));
        assert_eq!(VectorStoreKind::from_str("qdrant"), Some(VectorStoreKind::Qdrant));
        assert_eq!(VectorStoreKind::from_str("memory"), Some(VectorStoreKind::Local));
        assert_eq!(VectorStoreKind::from_str("faiss"), None);
    }
}
