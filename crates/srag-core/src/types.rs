//! Common types used across the Simple RAG system

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Compute the content hash used to detect duplicate retrieval results.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Configuration for retry behavior of remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// A single attempt, no backoff. Handy for tests and one-shot tools.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_backoff.saturating_mul(1u32 << exp);
        delay.min(self.max_backoff)
    }
}

/// Metadata attached to every chunk in the vector store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    /// Original filename of the upload; per-file queries filter on this.
    pub file_name: String,
    /// Identifier of the node the chunk was produced as.
    pub node_id: String,
    /// Path the raw upload was persisted to.
    pub source: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A contiguous span of extracted document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn content_hash(&self) -> String {
        content_hash(&self.text)
    }
}

/// A chunk paired with its embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk (or trimmed span of one) returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    /// Digest of `text`. `None` is compared like any other value.
    pub hash: Option<String>,
    pub metadata: ChunkMetadata,
}

impl ScoredResult {
    pub fn new(id: impl Into<String>, text: impl Into<String>, score: f32, metadata: ChunkMetadata) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            hash: Some(content_hash(&text)),
            text,
            score,
            metadata,
        }
    }

    /// Replace the text, keeping the hash in sync with it.
    pub fn set_text(&mut self, text: String) {
        self.hash = Some(content_hash(&text));
        self.text = text;
    }

    pub fn with_hash(mut self, hash: Option<String>) -> Self {
        self.hash = hash;
        self
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Exact-match metadata filter applied to vector store queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

impl MetadataFilter {
    pub const FILE_NAME: &'static str = "file_name";

    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Restrict results to chunks from one uploaded file.
    pub fn file_name(name: impl Into<String>) -> Self {
        Self::new(Self::FILE_NAME, name)
    }

    /// Check the filter against chunk metadata.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match self.key.as_str() {
            "file_name" => metadata.file_name == self.value,
            "node_id" => metadata.node_id == self.value,
            "source" => metadata.source == self.value,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello "));
        assert_eq!(content_hash("hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_set_text_updates_hash() {
        let mut result = ScoredResult::new("1", "First. Second.", 0.9, ChunkMetadata::default());
        let before = result.hash.clone();
        result.set_text("First.".to_string());
        assert_ne!(result.hash, before);
        assert_eq!(result.hash, Some(content_hash("First.")));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_secs(1));
        assert_eq!(config.backoff(3), Duration::from_secs(2));
        assert_eq!(config.backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn test_metadata_filter_matches_file_name() {
        let metadata = ChunkMetadata {
            file_name: "a.pdf".to_string(),
            ..Default::default()
        };
        assert!(MetadataFilter::file_name("a.pdf").matches(&metadata));
        assert!(!MetadataFilter::file_name("b.pdf").matches(&metadata));
        assert!(!MetadataFilter::new("unknown", "a.pdf").matches(&metadata));
    }

    #[test]
    fn test_role_serialization() {
        let turn = ConversationTurn::user("hi");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
