//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ConversationTurn;
use crate::Result;

/// Configuration for chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

/// Trait for hosted language models (e.g. OpenAI chat completions)
///
/// A completion takes the retrieved context, the prior conversation and the
/// new user message, and returns the assistant's answer text.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Answer `message` given `context` and the prior `history`
    async fn complete(
        &self,
        context: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
