//! OpenAI configuration

use serde::{Deserialize, Serialize};
use std::env;
use srag_core::{Error, Result, RetryConfig};

/// Configuration for the OpenAI client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub api_base: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub embed_batch_size: usize,
    #[serde(skip)]
    pub retry: RetryConfig,
}

impl OpenAIConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.openai.com/v1";

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            Error::Configuration("OPENAI_API_KEY environment variable not found".to_string())
        })?;

        let mut config = Self::new(api_key);

        if let Ok(api_base) = env::var("OPENAI_API_BASE") {
            config.api_base = api_base;
        }
        if let Ok(model) = env::var("OPENAI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(model) = env::var("OPENAI_CHAT_MODEL") {
            config.chat_model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            embed_batch_size: 100,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check the values are usable before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration("OpenAI API key is empty".to_string()));
        }
        url::Url::parse(&self.api_base).map_err(|e| {
            Error::Configuration(format!("invalid OpenAI API base '{}': {}", self.api_base, e))
        })?;
        if self.embed_batch_size == 0 {
            return Err(Error::Configuration(
                "embedding batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}
