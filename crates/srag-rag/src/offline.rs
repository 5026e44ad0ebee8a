//! Answering without a language model

use async_trait::async_trait;
use std::collections::HashSet;

use srag_core::{ConversationTurn, Error, LLMProvider, Result};

use crate::sentences::SentenceSplitter;

const SEPARATOR: &str = "--------------------";
const MAX_SENTENCES: usize = 3;

/// Answers with the context sentences sharing the most words with the
/// question. Used by `--offline` runs where no chat model is reachable.
pub struct ExtractiveResponder {
    splitter: SentenceSplitter,
}

impl ExtractiveResponder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            splitter: SentenceSplitter::new()?,
        })
    }

    fn words(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .map(str::to_lowercase)
            .collect()
    }

    /// Text between the separators of the context block, or all of it
    fn context_body(context: &str) -> &str {
        let mut parts = context.split(SEPARATOR);
        match (parts.next(), parts.next()) {
            (Some(_), Some(body)) => body,
            _ => context,
        }
    }

    fn best_sentences(&self, context: &str, question: &str) -> Vec<String> {
        let question_words = Self::words(question);

        let mut scored: Vec<(usize, usize, String)> = self
            .splitter
            .split(Self::context_body(context))
            .into_iter()
            .enumerate()
            .map(|(position, sentence)| {
                let overlap = Self::words(&sentence).intersection(&question_words).count();
                (overlap, position, sentence)
            })
            .filter(|(overlap, _, _)| *overlap > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(MAX_SENTENCES);
        scored.sort_by_key(|(_, position, _)| *position);

        scored.into_iter().map(|(_, _, sentence)| sentence).collect()
    }
}

#[async_trait]
impl LLMProvider for ExtractiveResponder {
    async fn complete(&self, context: &str, _history: &[ConversationTurn], message: &str) -> Result<String> {
        let sentences = self.best_sentences(context, message);
        if sentences.is_empty() {
            return Err(Error::LLMProvider(
                "no context sentence matches the question".to_string(),
            ));
        }
        Ok(sentences.join(" "))
    }

    fn model_id(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::build_context;
    use srag_core::ScoredResult;

    #[tokio::test]
    async fn test_picks_overlapping_sentences_in_order() {
        let context = build_context(&[ScoredResult::new(
            "a",
            "The budget was approved in March. Penguins are birds. The March budget covers hiring.",
            0.9,
            Default::default(),
        )]);

        let responder = ExtractiveResponder::new().unwrap();
        let answer = responder.complete(&context, &[], "When was the budget approved?").await.unwrap();
        assert_eq!(answer, "The budget was approved in March. The March budget covers hiring.");
    }

    #[tokio::test]
    async fn test_no_overlap_is_an_error() {
        let responder = ExtractiveResponder::new().unwrap();
        let result = responder.complete("Unrelated text.", &[], "quantum?").await;
        assert!(matches!(result, Err(Error::LLMProvider(_))));
    }
}
