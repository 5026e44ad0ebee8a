//! Retrieval-augmented chat over the indexed documents

use std::fmt;
use std::sync::Arc;

use srag_core::{
    ConversationTurn, EmbeddingProvider, Error, LLMProvider, MetadataFilter, Result,
    ScoredResult, VectorStore,
};

use crate::config::PipelineConfig;
use crate::postprocess::{self, DuplicateRemover, NodePostprocessor, QueryBundle, RelevanceTrimmer};

/// Answer given when nothing relevant was retrieved or a step failed
pub const FALLBACK_ANSWER: &str = "Sorry, I don't know the answer to that question.";

/// First assistant message shown in a new session. Display only.
pub const GREETING: &str = "Hi. I'm here to help you. Ask away!";

/// Where a chat turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatStage {
    #[default]
    Idle,
    Embedding,
    Retrieving,
    Trimming,
    Deduplicating,
    Generating,
    Responded,
    Failed,
}

impl ChatStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStage::Idle => "idle",
            ChatStage::Embedding => "embedding",
            ChatStage::Retrieving => "retrieving",
            ChatStage::Trimming => "trimming",
            ChatStage::Deduplicating => "deduplicating",
            ChatStage::Generating => "generating",
            ChatStage::Responded => "responded",
            ChatStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ChatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one conversation
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    transcript: Vec<ConversationTurn>,
    context_file: Option<String>,
    cite_nodes: bool,
    stage: ChatStage,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict retrieval to chunks from one uploaded file
    pub fn with_context_file(mut self, file_name: impl Into<String>) -> Self {
        self.context_file = Some(file_name.into());
        self
    }

    pub fn set_context_file(&mut self, file_name: Option<String>) {
        self.context_file = file_name;
    }

    pub fn context_file(&self) -> Option<&str> {
        self.context_file.as_deref()
    }

    pub fn cite_nodes(&self) -> bool {
        self.cite_nodes
    }

    pub fn set_cite_nodes(&mut self, cite: bool) {
        self.cite_nodes = cite;
    }

    /// Flip citation display, returning the new setting
    pub fn toggle_citations(&mut self) -> bool {
        self.cite_nodes = !self.cite_nodes;
        self.cite_nodes
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    pub fn stage(&self) -> ChatStage {
        self.stage
    }

    fn record(&mut self, question: &str, answer: &str) {
        self.transcript.push(ConversationTurn::user(question));
        self.transcript.push(ConversationTurn::assistant(answer));
    }
}

/// The answer to one question
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub answer: String,
    /// Results the answer was generated from, after post-processing
    pub sources: Vec<ScoredResult>,
}

impl ChatResponse {
    pub fn fallback() -> Self {
        Self {
            answer: FALLBACK_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.sources.is_empty() && self.answer == FALLBACK_ANSWER
    }
}

/// Context block handed to the language model
pub fn build_context(results: &[ScoredResult]) -> String {
    let body = results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below.\n--------------------\n{}\n--------------------\n",
        body
    )
}

/// Embed, retrieve, post-process, generate
pub struct ChatPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMProvider>,
    postprocessors: Vec<Box<dyn NodePostprocessor>>,
    top_k: usize,
}

impl ChatPipeline {
    /// Pipeline with the default post-processors: trimming, then dedup
    pub fn new(
        config: &PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let trimmer = RelevanceTrimmer::new(
            embedder.clone(),
            config.percentile_cutoff,
            config.threshold_cutoff,
        )?
        .with_drop_empty(config.drop_empty);

        Ok(Self {
            embedder,
            store,
            llm,
            postprocessors: vec![Box::new(trimmer), Box::new(DuplicateRemover)],
            top_k: config.top_k,
        })
    }

    /// Replace the post-processors; they run in the given order
    pub fn with_postprocessors(mut self, postprocessors: Vec<Box<dyn NodePostprocessor>>) -> Self {
        self.postprocessors = postprocessors;
        self
    }

    /// Answer `message` within `session`. Failures are logged and answered
    /// with [`FALLBACK_ANSWER`]; the question and answer are always recorded.
    pub async fn chat(&self, session: &mut ChatSession, message: &str) -> ChatResponse {
        match self.answer(session, message).await {
            Ok(response) => {
                session.record(message, &response.answer);
                session.stage = ChatStage::Responded;
                response
            }
            Err(e) => {
                tracing::error!(stage = %session.stage, error = %e, "chat turn failed");
                session.record(message, FALLBACK_ANSWER);
                session.stage = ChatStage::Failed;
                ChatResponse::fallback()
            }
        }
    }

    async fn answer(&self, session: &mut ChatSession, message: &str) -> Result<ChatResponse> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("question is empty".to_string()));
        }

        session.stage = ChatStage::Embedding;
        let embedding = self.embedder.embed(message).await?;

        session.stage = ChatStage::Retrieving;
        let filters: Vec<MetadataFilter> = session
            .context_file()
            .map(MetadataFilter::file_name)
            .into_iter()
            .collect();
        let retrieved = self.store.query(&embedding, self.top_k, &filters).await?;
        tracing::info!(retrieved = retrieved.len(), context = ?session.context_file(), "retrieved chunks");

        let query = QueryBundle::new(message, embedding);
        let sources = postprocess::apply_all(&self.postprocessors, retrieved, &query, |stage| {
            session.stage = stage;
        })
        .await?;

        if sources.is_empty() {
            tracing::info!("no usable context, answering with fallback");
            return Ok(ChatResponse::fallback());
        }

        session.stage = ChatStage::Generating;
        let context = build_context(&sources);
        let answer = self.llm.complete(&context, session.transcript(), message).await?;

        Ok(ChatResponse { answer, sources })
    }
}
