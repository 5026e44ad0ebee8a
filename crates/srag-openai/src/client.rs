//! OpenAI client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use srag_core::{
    ConversationTurn, EmbeddingProvider, Error, GenerationConfig, LLMProvider, Result,
    with_retry,
};

use crate::config::OpenAIConfig;

/// OpenAI client for embeddings and chat completions
pub struct OpenAIClient {
    config: OpenAIConfig,
    client: Client,
    generation: GenerationConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub(crate) role: &'a str,
    pub(crate) content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    pub(crate) messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAIClient {
    /// Create a new OpenAI client from configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.retry.request_timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let generation = GenerationConfig {
            model_id: config.chat_model.clone(),
            ..Default::default()
        };

        Ok(Self {
            config,
            client,
            generation,
        })
    }

    /// Create a new OpenAI client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig::from_env()?;
        Self::new(config)
    }

    /// Override generation settings for chat completions
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Assemble the chat request: context as the system message, then the
    /// transcript, then the new user message.
    pub(crate) fn build_chat_request<'a>(
        &'a self,
        context: &'a str,
        history: &'a [ConversationTurn],
        message: &'a str,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !context.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: context,
            });
        }
        for turn in history {
            messages.push(ChatMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: message,
        });

        ChatRequest {
            model: &self.generation.model_id,
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
            messages,
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(map_status_error(status, path, error_text))
    }

    async fn perform_embedding(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: inputs,
        };

        let response = self.post_json("embeddings", &request).await?;
        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if parsed.data.len() != inputs.len() {
            return Err(Error::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        parsed.data.sort_by_key(|entry| entry.index);
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    async fn perform_completion(
        &self,
        context: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String> {
        let request = self.build_chat_request(context, history, message);
        let response = self.post_json("chat/completions", &request).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(Error::LLMProvider(
                "Empty response from OpenAI chat completions".to_string(),
            ));
        }

        Ok(answer.trim().to_string())
    }
}

fn map_transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

pub(crate) fn map_status_error(status: StatusCode, path: &str, body: String) -> Error {
    let message = format!("OpenAI {} request failed with status {}: {}", path, status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(message),
        s if s.is_server_error() => Error::Network(message),
        _ if path == "embeddings" => Error::Embedding(message),
        _ => Error::LLMProvider(message),
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inputs = [text.to_string()];
        let mut embeddings = self.embed_batch(&inputs).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::Embedding("OpenAI returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embed_batch_size) {
            let vectors = with_retry(&self.config.retry, "openai embeddings", || {
                self.perform_embedding(batch)
            })
            .await?;
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }

    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn complete(
        &self,
        context: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String> {
        with_retry(&self.config.retry, "openai chat completion", || {
            self.perform_completion(context, history, message)
        })
        .await
    }

    fn model_id(&self) -> &str {
        &self.generation.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        let err = map_status_error(StatusCode::UNAUTHORIZED, "embeddings", "bad key".to_string());
        assert!(matches!(err, Error::Authentication(_)));

        let err = map_status_error(StatusCode::TOO_MANY_REQUESTS, "chat/completions", String::new());
        assert!(err.is_retryable());

        let err = map_status_error(StatusCode::BAD_GATEWAY, "chat/completions", String::new());
        assert!(matches!(err, Error::Network(_)));

        let err = map_status_error(StatusCode::BAD_REQUEST, "embeddings", String::new());
        assert!(matches!(err, Error::Embedding(_)));

        let err = map_status_error(StatusCode::BAD_REQUEST, "chat/completions", String::new());
        assert!(matches!(err, Error::LLMProvider(_)));
    }

    #[test]
    fn test_chat_request_without_context() {
        let client = OpenAIClient::new(OpenAIConfig::new("test_key".to_string())).unwrap();
        let request = client.build_chat_request("", &[], "hello");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
    }
}
