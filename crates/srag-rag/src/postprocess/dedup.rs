use async_trait::async_trait;
use std::collections::HashSet;

use srag_core::{Result, ScoredResult};

use super::{NodePostprocessor, QueryBundle};
use crate::chat::ChatStage;

/// Drops results whose content hash was already seen, keeping the first
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateRemover;

impl DuplicateRemover {
    pub fn dedup(&self, results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        let mut seen: HashSet<Option<String>> = HashSet::with_capacity(results.len());
        results
            .into_iter()
            .filter(|result| seen.insert(result.hash.clone()))
            .collect()
    }
}

#[async_trait]
impl NodePostprocessor for DuplicateRemover {
    async fn process(&self, results: Vec<ScoredResult>, _query: &QueryBundle) -> Result<Vec<ScoredResult>> {
        Ok(self.dedup(results))
    }

    fn stage(&self) -> ChatStage {
        ChatStage::Deduplicating
    }

    fn name(&self) -> &'static str {
        "duplicate_remover"
    }
}
