//! End-to-end tests for ingestion, uploads and chat

#[cfg(test)]
mod pipeline_tests {
    use crate::{
        ChatPipeline, ChatSession, ChatStage, DuplicateRemover, ExtractorSet, FilenameLedger,
        HashEmbedder, IngestStatus, IngestionPipeline, LocalVectorStore, NodePostprocessor,
        PipelineConfig, QueryBundle, UploadOutcome, UploadStore, Uploader, FALLBACK_ANSWER,
    };
    use async_trait::async_trait;
    use srag_core::{
        Chunk, ChunkMetadata, ConversationTurn, DocumentType, EmbeddedChunk, EmbeddingProvider,
        Error, LLMProvider, MetadataFilter, Result, ScoredResult, TextExtractor, VectorStore,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Stands in for PDF parsing; returns three "pages" of fixed text
    struct ThreePageExtractor;

    #[async_trait]
    impl TextExtractor for ThreePageExtractor {
        fn supports(&self, document_type: DocumentType) -> bool {
            document_type == DocumentType::Pdf
        }

        async fn extract(&self, _bytes: &[u8]) -> Result<String> {
            Ok(["a".repeat(600), "b".repeat(600), "c".repeat(600)].concat())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl TextExtractor for FailingExtractor {
        fn supports(&self, document_type: DocumentType) -> bool {
            document_type == DocumentType::Pdf
        }

        async fn extract(&self, _bytes: &[u8]) -> Result<String> {
            Err(Error::Extraction("corrupt xref table".to_string()))
        }
    }

    /// Local store that remembers every upserted record
    #[derive(Default)]
    struct RecordingStore {
        inner: LocalVectorStore,
        upserted: Mutex<Vec<EmbeddedChunk>>,
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize> {
            self.upserted.lock().unwrap().extend(chunks.iter().cloned());
            self.inner.upsert(chunks).await
        }

        async fn query(&self, vector: &[f32], top_k: usize, filters: &[MetadataFilter]) -> Result<Vec<ScoredResult>> {
            self.inner.query(vector, top_k, filters).await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }

        fn index_name(&self) -> &str {
            "recording"
        }
    }

    /// Language model that counts calls and echoes what it was given
    #[derive(Default)]
    struct CountingLlm {
        calls: AtomicUsize,
        history_lengths: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl LLMProvider for CountingLlm {
        async fn complete(&self, context: &str, history: &[ConversationTurn], message: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.history_lengths.lock().unwrap().push(history.len());
            assert!(context.starts_with("Context information is below."));
            Ok(format!("answer to '{}'", message))
        }

        fn model_id(&self) -> &str {
            "counting"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LLMProvider for FailingLlm {
        async fn complete(&self, _context: &str, _history: &[ConversationTurn], _message: &str) -> Result<String> {
            Err(Error::Network("connection refused".to_string()))
        }

        fn model_id(&self) -> &str {
            "failing"
        }
    }

    /// Every text embeds to the same direction, so every chunk scores 1.0
    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        fn model_id(&self) -> &str {
            "constant"
        }
    }

    fn permissive_config(uploads_dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            threshold_cutoff: 0.0,
            top_k: 4,
            uploads_dir: uploads_dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn stored(id: &str, file_name: &str, text: &str) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                id: id.to_string(),
                text: text.to_string(),
                metadata: ChunkMetadata {
                    file_name: file_name.to_string(),
                    node_id: id.to_string(),
                    ..Default::default()
                },
            },
            embedding: vec![1.0, 0.0, 0.0],
        }
    }

    async fn uploader(
        dir: &std::path::Path,
        store: Arc<dyn VectorStore>,
        extractors: ExtractorSet,
    ) -> Uploader {
        let config = PipelineConfig {
            uploads_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let ledger = Arc::new(FilenameLedger::open(config.ledger_path()).await.unwrap());
        let pipeline = IngestionPipeline::new(config, Arc::new(HashEmbedder::default()), store)
            .unwrap()
            .with_extractors(extractors);
        Uploader::new(UploadStore::new(dir), ledger, Arc::new(pipeline))
    }

    #[tokio::test]
    async fn test_three_page_pdf_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let uploader = uploader(
            dir.path(),
            store.clone(),
            ExtractorSet::new(vec![Arc::new(ThreePageExtractor)]),
        )
        .await;

        let mut seen = Vec::new();
        let outcome = uploader
            .upload("report.pdf", b"%PDF-1.7 three pages".to_vec(), false, |status| {
                seen.push(status.kind())
            })
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec!["started", "extracting", "splitting", "embedding", "indexing", "completed"]
        );
        assert_eq!(outcome, UploadOutcome::Ingested { chunks: 4 });

        let upserted = store.upserted.lock().unwrap().clone();
        assert_eq!(upserted.len(), 4);
        assert!(upserted.iter().all(|r| r.chunk.metadata.file_name == "report.pdf"));
        assert!(upserted.iter().all(|r| r.chunk.metadata.total_chunks == 4));

        assert!(uploader.ledger().contains("report.pdf").await.unwrap());
        assert!(dir.path().join("report.pdf").exists());
    }

    #[tokio::test]
    async fn test_failed_ingestion_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let uploader = uploader(
            dir.path(),
            store.clone(),
            ExtractorSet::new(vec![Arc::new(FailingExtractor)]),
        )
        .await;

        let mut last = None;
        let outcome = uploader
            .upload("broken.pdf", b"%PDF-1.4".to_vec(), false, |status| {
                last = Some(status.to_string())
            })
            .await
            .unwrap();

        assert!(matches!(outcome, UploadOutcome::Failed { ref error } if error.contains("corrupt xref")));
        assert_eq!(
            last.as_deref(),
            Some("❌ Error: Text extraction error: corrupt xref table")
        );
        assert!(!uploader.ledger().contains("broken.pdf").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reupload_is_skipped_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let uploader = uploader(dir.path(), store.clone(), ExtractorSet::default()).await;

        let first = uploader
            .upload("notes.md", b"# Notes\n\nShort note.".to_vec(), false, |_| {})
            .await
            .unwrap();
        assert_eq!(first, UploadOutcome::Ingested { chunks: 1 });

        let mut statuses = 0;
        let second = uploader
            .upload("notes.md", b"# Notes\n\nShort note.".to_vec(), false, |_| statuses += 1)
            .await
            .unwrap();
        assert_eq!(second, UploadOutcome::AlreadyIngested);
        assert_eq!(statuses, 0);

        let forced = uploader
            .upload("notes.md", b"# Notes\n\nShort note.".to_vec(), true, |_| {})
            .await
            .unwrap();
        assert_eq!(forced, UploadOutcome::Ingested { chunks: 1 });
        assert_eq!(uploader.ledger().filenames().await.unwrap(), vec!["notes.md"]);
    }

    #[tokio::test]
    async fn test_duplicate_chunks_are_removed_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalVectorStore::new());
        store
            .upsert(vec![
                stored("n1", "a.txt", "alpha"),
                stored("n2", "a.txt", "beta"),
                stored("n3", "a.txt", "alpha"),
            ])
            .await
            .unwrap();

        let llm = Arc::new(CountingLlm::default());
        let pipeline = ChatPipeline::new(
            &permissive_config(dir.path()),
            Arc::new(ConstantEmbedder),
            store,
            llm.clone(),
        )
        .unwrap();

        let mut session = ChatSession::new();
        let response = pipeline.chat(&mut session, "tell me").await;

        let mut texts: Vec<&str> = response.sources.iter().map(|r| r.text.as_str()).collect();
        texts.sort();
        assert_eq!(texts, vec!["alpha", "beta"]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    /// Keeps only the best result
    struct TopOne;

    #[async_trait]
    impl NodePostprocessor for TopOne {
        async fn process(&self, mut results: Vec<ScoredResult>, _query: &QueryBundle) -> Result<Vec<ScoredResult>> {
            results.truncate(1);
            Ok(results)
        }

        fn stage(&self) -> ChatStage {
            ChatStage::Trimming
        }

        fn name(&self) -> &'static str {
            "top_one"
        }
    }

    #[tokio::test]
    async fn test_custom_postprocessors_replace_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalVectorStore::new());
        store
            .upsert(vec![
                stored("n1", "a.txt", "alpha"),
                stored("n2", "a.txt", "alpha"),
                stored("n3", "a.txt", "beta"),
            ])
            .await
            .unwrap();
        let config = permissive_config(dir.path());

        let unfiltered = ChatPipeline::new(&config, Arc::new(ConstantEmbedder), store.clone(), Arc::new(CountingLlm::default()))
            .unwrap()
            .with_postprocessors(Vec::new());
        let response = unfiltered.chat(&mut ChatSession::new(), "tell me").await;
        assert_eq!(response.sources.len(), 3);

        let deduped_then_top = ChatPipeline::new(&config, Arc::new(ConstantEmbedder), store, Arc::new(CountingLlm::default()))
            .unwrap()
            .with_postprocessors(vec![Box::new(DuplicateRemover), Box::new(TopOne)]);
        let mut session = ChatSession::new();
        let response = deduped_then_top.chat(&mut session, "tell me").await;
        assert_eq!(response.sources.len(), 1);
        assert_eq!(session.stage(), ChatStage::Responded);
    }

    #[tokio::test]
    async fn test_nothing_relevant_answers_without_llm() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalVectorStore::new());
        let embedder = Arc::new(HashEmbedder::default());

        let text = "Penguins live in the southern hemisphere.";
        store
            .upsert(vec![EmbeddedChunk {
                embedding: embedder.embed(text).await.unwrap(),
                ..stored("n1", "birds.txt", text)
            }])
            .await
            .unwrap();

        let llm = Arc::new(CountingLlm::default());
        let config = PipelineConfig {
            uploads_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let pipeline = ChatPipeline::new(&config, embedder, store, llm.clone()).unwrap();

        let mut session = ChatSession::new();
        let response = pipeline.chat(&mut session, "quarterly revenue forecast").await;

        assert!(response.is_fallback());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.stage(), ChatStage::Responded);
        assert_eq!(
            session.transcript(),
            &[
                ConversationTurn::user("quarterly revenue forecast"),
                ConversationTurn::assistant(FALLBACK_ANSWER),
            ]
        );
    }

    #[tokio::test]
    async fn test_context_file_filter_isolates_sources() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalVectorStore::new());
        store
            .upsert(vec![
                stored("a1", "a.txt", "from file a"),
                stored("a2", "a.txt", "more from file a"),
                stored("b1", "b.txt", "from file b"),
            ])
            .await
            .unwrap();

        let pipeline = ChatPipeline::new(
            &permissive_config(dir.path()),
            Arc::new(ConstantEmbedder),
            store,
            Arc::new(CountingLlm::default()),
        )
        .unwrap();

        let mut session = ChatSession::new().with_context_file("b.txt");
        let response = pipeline.chat(&mut session, "what is in the file").await;

        assert!(!response.sources.is_empty());
        assert!(response.sources.iter().all(|r| r.metadata.file_name == "b.txt"));
    }

    #[tokio::test]
    async fn test_transcript_grows_and_is_sent_as_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalVectorStore::new());
        store.upsert(vec![stored("n1", "a.txt", "some fact")]).await.unwrap();

        let llm = Arc::new(CountingLlm::default());
        let pipeline = ChatPipeline::new(
            &permissive_config(dir.path()),
            Arc::new(ConstantEmbedder),
            store,
            llm.clone(),
        )
        .unwrap();

        let mut session = ChatSession::new();
        let first = pipeline.chat(&mut session, "first question").await;
        let second = pipeline.chat(&mut session, "second question").await;

        assert_eq!(first.answer, "answer to 'first question'");
        assert_eq!(second.answer, "answer to 'second question'");
        assert_eq!(*llm.history_lengths.lock().unwrap(), vec![0, 2]);
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_llm_failure_is_masked() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalVectorStore::new());
        store.upsert(vec![stored("n1", "a.txt", "some fact")]).await.unwrap();

        let pipeline = ChatPipeline::new(
            &permissive_config(dir.path()),
            Arc::new(ConstantEmbedder),
            store,
            Arc::new(FailingLlm),
        )
        .unwrap();

        let mut session = ChatSession::new();
        let response = pipeline.chat(&mut session, "anything").await;

        assert_eq!(response.answer, FALLBACK_ANSWER);
        assert_eq!(session.stage(), ChatStage::Failed);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_offline_stack_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = permissive_config(dir.path());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::default());
        let store: Arc<dyn VectorStore> =
            Arc::new(LocalVectorStore::open(config.local_index_path()).await.unwrap());

        let ingestion = IngestionPipeline::new(config.clone(), embedder.clone(), store.clone()).unwrap();
        let ledger = Arc::new(FilenameLedger::open(config.ledger_path()).await.unwrap());
        let uploader = Uploader::new(UploadStore::new(dir.path()), ledger, Arc::new(ingestion));

        let outcome = uploader
            .upload(
                "budget.txt",
                b"The budget was approved in March. Hiring starts in May.".to_vec(),
                false,
                |_| {},
            )
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::Ingested { chunks: 1 });

        let pipeline = ChatPipeline::new(
            &config,
            embedder,
            store,
            Arc::new(crate::ExtractiveResponder::new().unwrap()),
        )
        .unwrap();

        let mut session = ChatSession::new().with_context_file("budget.txt");
        let response = pipeline.chat(&mut session, "When was the budget approved?").await;
        assert!(response.answer.contains("approved in March"));
        assert_eq!(response.sources[0].metadata.file_name, "budget.txt");
    }

    #[test]
    fn test_ingest_status_strings() {
        assert_eq!(IngestStatus::Splitting.to_string(), "🟡 Splitting text into chunks/nodes...");
        assert_eq!(IngestStatus::Embedding.to_string(), "🟡 Generating embeddings...");
        assert_eq!(IngestStatus::Indexing.to_string(), "🟡 Indexing...");
    }
}
