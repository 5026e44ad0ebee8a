//! Offline embedding model

use async_trait::async_trait;

use srag_core::{EmbeddingProvider, Result};

/// Deterministic hashed bag-of-words embeddings.
///
/// No network and no model weights; similar wording gives similar vectors,
/// which is enough for offline runs and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Slot for a feature. MD5 keeps vectors comparable across builds, so a
    /// persisted local index stays valid.
    fn bucket(&self, feature: &str) -> (usize, u64) {
        let digest = md5::compute(feature.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.0[..8]);
        let hash = u64::from_le_bytes(prefix);
        (self.slot(hash), hash)
    }

    fn slot(&self, hash: u64) -> usize {
        (hash % self.dimensions as u64) as usize
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let normalized_text = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>();

        let words: Vec<&str> = normalized_text.split_whitespace().collect();
        let mut embedding = vec![0.0f32; self.dimensions];

        for word in &words {
            let (idx, hash) = self.bucket(word);
            embedding[idx] += 1.0;

            if word.len() > 3 {
                let secondary_idx = self.slot(hash >> 16);
                embedding[secondary_idx] += 0.5;
            }
        }

        for window in words.windows(2) {
            let (idx, _) = self.bucket(&format!("{} {}", window[0], window[1]));
            embedding[idx] += 0.3;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn model_id(&self) -> &str {
        "hash-bow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srag_core::cosine_similarity;

    #[tokio::test]
    async fn test_embeddings_are_deterministic_and_normalized() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("The quarterly budget was approved").await.unwrap();
        let b = embedder.embed("The quarterly budget was approved").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), HashEmbedder::DEFAULT_DIMENSIONS);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_similar_text_scores_higher() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed("budget approval").await.unwrap();
        let related = embedder.embed("the budget approval meeting").await.unwrap();
        let unrelated = embedder.embed("penguins live in antarctica").await.unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_buckets_are_stable() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.bucket("budget"), (175, 13389898569022972207));
        assert_eq!(embedder.bucket("quarterly budget").0, 92);
    }

    #[tokio::test]
    async fn test_empty_text_gives_zero_vector() {
        let embedder = HashEmbedder::new(8);
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
