//! Post-processing of retrieved results
//!
//! Processors run in order over the results of one query; each receives the
//! output of the previous one.

mod dedup;
mod trimmer;

use async_trait::async_trait;

use srag_core::{Result, ScoredResult};

use crate::chat::ChatStage;

pub use dedup::DuplicateRemover;
pub use trimmer::{RelevanceTrimmer, percentile};

/// The question being answered, with its embedding
#[derive(Debug, Clone)]
pub struct QueryBundle {
    pub text: String,
    pub embedding: Vec<f32>,
}

impl QueryBundle {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// A step that filters or rewrites retrieved results
#[async_trait]
pub trait NodePostprocessor: Send + Sync {
    async fn process(&self, results: Vec<ScoredResult>, query: &QueryBundle) -> Result<Vec<ScoredResult>>;

    /// Chat stage reported while this processor runs
    fn stage(&self) -> ChatStage;

    fn name(&self) -> &'static str;
}

/// Run `processors` in order, feeding each the previous output.
/// `on_stage` is told which stage each processor represents before it runs.
pub async fn apply_all(
    processors: &[Box<dyn NodePostprocessor>],
    mut results: Vec<ScoredResult>,
    query: &QueryBundle,
    mut on_stage: impl FnMut(ChatStage) + Send,
) -> Result<Vec<ScoredResult>> {
    for processor in processors {
        on_stage(processor.stage());
        let before = results.len();
        results = processor.process(results, query).await?;
        tracing::debug!(processor = processor.name(), before, after = results.len(), "post-processed results");
    }
    Ok(results)
}
