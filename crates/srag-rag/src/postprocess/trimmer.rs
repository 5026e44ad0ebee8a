use async_trait::async_trait;
use std::sync::Arc;

use srag_core::{EmbeddingProvider, Error, Result, ScoredResult, cosine_similarity};

use super::{NodePostprocessor, QueryBundle};
use crate::chat::ChatStage;
use crate::sentences::SentenceSplitter;

/// Value at fraction `p` of `values`, interpolating linearly between the
/// closest ranks. `None` for an empty slice.
pub fn percentile(values: &[f32], p: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f32;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Drops weak results, then keeps only the sentences of each survivor that
/// score at or above the chosen percentile against the query.
pub struct RelevanceTrimmer {
    embedder: Arc<dyn EmbeddingProvider>,
    percentile_cutoff: f32,
    threshold_cutoff: f32,
    drop_empty: bool,
    splitter: SentenceSplitter,
}

impl RelevanceTrimmer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        percentile_cutoff: f32,
        threshold_cutoff: f32,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&percentile_cutoff) {
            return Err(Error::Configuration(format!(
                "percentile cutoff {} is outside [0, 1]",
                percentile_cutoff
            )));
        }

        Ok(Self {
            embedder,
            percentile_cutoff,
            threshold_cutoff,
            drop_empty: true,
            splitter: SentenceSplitter::new()?,
        })
    }

    /// Keep results whose text trims down to nothing
    pub fn keep_empty(mut self) -> Self {
        self.drop_empty = false;
        self
    }

    pub fn with_drop_empty(mut self, drop_empty: bool) -> Self {
        self.drop_empty = drop_empty;
        self
    }

    /// Sentences of `text`, each with its whitespace collapsed
    pub fn sentences(&self, text: &str) -> Vec<String> {
        self.splitter.split(text)
    }

    async fn trim_text(&self, text: &str, query_embedding: &[f32]) -> Result<Option<String>> {
        let sentences = self.sentences(text);
        match sentences.len() {
            0 => return Ok(Some(String::new())),
            1 => return Ok(None),
            _ => {}
        }

        let embeddings = self.embedder.embed_batch(&sentences).await?;
        let scores: Vec<f32> = embeddings
            .iter()
            .map(|embedding| cosine_similarity(query_embedding, embedding))
            .collect();

        let max = scores.iter().copied().fold(f32::MIN, f32::max);
        let cutoff = percentile(&scores, self.percentile_cutoff)
            .unwrap_or(f32::MIN)
            .min(max);

        let kept: Vec<String> = sentences
            .into_iter()
            .zip(scores)
            .filter(|(_, score)| *score >= cutoff)
            .map(|(sentence, _)| sentence)
            .collect();

        Ok(Some(kept.join(" ")))
    }

    pub async fn trim(&self, results: Vec<ScoredResult>, query: &QueryBundle) -> Result<Vec<ScoredResult>> {
        let mut trimmed = Vec::with_capacity(results.len());

        for mut result in results {
            if result.score < self.threshold_cutoff {
                tracing::debug!(id = %result.id, score = result.score, "below threshold, dropped");
                continue;
            }

            if let Some(text) = self.trim_text(&result.text, &query.embedding).await? {
                result.set_text(text);
            }

            if self.drop_empty && result.text.trim().is_empty() {
                tracing::debug!(id = %result.id, "empty after trimming, dropped");
                continue;
            }
            trimmed.push(result);
        }

        Ok(trimmed)
    }
}

#[async_trait]
impl NodePostprocessor for RelevanceTrimmer {
    async fn process(&self, results: Vec<ScoredResult>, query: &QueryBundle) -> Result<Vec<ScoredResult>> {
        self.trim(results, query).await
    }

    fn stage(&self) -> ChatStage {
        ChatStage::Trimming
    }

    fn name(&self) -> &'static str {
        "relevance_trimmer"
    }
}
