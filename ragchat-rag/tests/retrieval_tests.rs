//! Ingestion and retrieval through the pipeline and the in-memory index.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;
use ragchat_rag::{
    Document, EmbeddingProvider, EmbeddingVector, InMemoryVectorStore, LexicalHashEmbedder,
    Passage, RagConfig, RagError, RagPipeline, Result, VectorStore,
};
use ragchat_telemetry::EventStore;

fn pipeline_with(config: RagConfig, provider: Arc<dyn EmbeddingProvider>) -> RagPipeline {
    RagPipeline::builder().config(config).embedding_provider(provider).build().unwrap()
}

fn small_config() -> RagConfig {
    RagConfig::builder().max_length(25).overlap(0).top_k(2).build().unwrap()
}

/// Embeds like [`LexicalHashEmbedder`] but reports a different model.
struct RenamedEmbedder {
    inner: LexicalHashEmbedder,
    model: String,
}

#[async_trait]
impl EmbeddingProvider for RenamedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Fails on any text containing `poison`.
struct PoisonedEmbedder {
    inner: LexicalHashEmbedder,
}

#[async_trait]
impl EmbeddingProvider for PoisonedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("poison") {
            return Err(RagError::EmbeddingFailure {
                provider: "poisoned".to_string(),
                message: "refused input".to_string(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Answers after an hour.
struct StalledEmbedder;

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![1.0; 4])
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_id(&self) -> &str {
        "stalled"
    }
}

/// Fails with a non-embedding error, which the pipeline must re-label.
struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Io(std::io::Error::other("socket closed")))
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_id(&self) -> &str {
        "broken"
    }
}

// ── ordering property ───────────────────────────────────────────────

fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
}

fn passage(i: usize) -> Passage {
    Passage {
        id: format!("doc_{i}"),
        document_id: "doc".to_string(),
        index: i,
        text: format!("passage {i}"),
        start: 0,
        end: 0,
        metadata: HashMap::new(),
    }
}

/// For any index and query, results are sorted by descending score and hold
/// exactly `min(k, len)` passages.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            embeddings in proptest::collection::vec(arb_embedding(DIM), 1..20),
            query in arb_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new("m", DIM);
                let entries = embeddings
                    .iter()
                    .enumerate()
                    .map(|(i, values)| (passage(i), EmbeddingVector::new("m", values.clone())))
                    .collect();
                store.insert(entries).await.unwrap();
                store.search(&EmbeddingVector::new("m", query), k).await.unwrap()
            });

            prop_assert_eq!(results.len(), k.min(embeddings.len()));
            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].score >= pair[1].score,
                    "results not sorted: {} < {}",
                    pair[0].score,
                    pair[1].score,
                );
            }
        }
    }
}

// ── pipeline behaviour ──────────────────────────────────────────────

#[tokio::test]
async fn test_retrieve_ranks_matching_passage_first() {
    let pipeline = pipeline_with(small_config(), Arc::new(LexicalHashEmbedder::default()));
    pipeline
        .ingest(&Document::new("people", "Alice is 30 years old. Bob is 25 years old."))
        .await
        .unwrap();

    let results = pipeline.retrieve("How old is Alice?", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.text, "Alice is 30 years old. ");

    let results = pipeline.retrieve("Bob", 2).await.unwrap();
    assert_eq!(results[0].passage.text, "Bob is 25 years old.");
}

#[tokio::test]
async fn test_k_larger_than_index_returns_everything() {
    let pipeline = pipeline_with(small_config(), Arc::new(LexicalHashEmbedder::default()));
    let stored = pipeline
        .ingest(&Document::new("people", "Alice is 30 years old. Bob is 25 years old."))
        .await
        .unwrap();

    let results = pipeline.retrieve("years", 50).await.unwrap();
    assert_eq!(results.len(), stored.len());
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_equal_scores_keep_ingestion_order() {
    let pipeline = pipeline_with(
        RagConfig::builder().max_length(100).overlap(0).build().unwrap(),
        Arc::new(LexicalHashEmbedder::default()),
    );
    pipeline.ingest(&Document::new("first", "shared words here")).await.unwrap();
    pipeline.ingest(&Document::new("second", "shared words here")).await.unwrap();
    pipeline.ingest(&Document::new("third", "shared words here")).await.unwrap();

    let results = pipeline.retrieve("shared words", 3).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.passage.document_id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_empty_index_returns_nothing_and_warns() {
    let events = EventStore::new();
    let _guard = tracing::subscriber::set_default(events.subscriber());

    let pipeline = pipeline_with(RagConfig::default(), Arc::new(LexicalHashEmbedder::default()));
    let results = pipeline.retrieve("anything at all", 4).await.unwrap();

    assert!(results.is_empty());
    assert!(events.contains("WARN", "retrieval against an empty index"));
}

#[tokio::test]
async fn test_invalid_queries_are_rejected() {
    let pipeline = pipeline_with(RagConfig::default(), Arc::new(LexicalHashEmbedder::default()));

    assert!(matches!(pipeline.retrieve("   ", 3).await, Err(RagError::InvalidInput(_))));
    assert!(matches!(pipeline.retrieve("alice", 0).await, Err(RagError::InvalidInput(_))));
    assert!(matches!(
        pipeline.ingest(&Document::new("blank", " \n\t ")).await,
        Err(RagError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_query_from_other_model_is_a_mismatch() {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new("lexical-hash-64", 64));
    assert_eq!(store.model_id(), "lexical-hash-64");
    assert_eq!(store.dimensions(), 64);
    let indexing = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(LexicalHashEmbedder::new(64)))
        .vector_store(store.clone())
        .build()
        .unwrap();
    indexing.ingest(&Document::new("people", "Alice is 30 years old.")).await.unwrap();

    let querying = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(RenamedEmbedder {
            inner: LexicalHashEmbedder::new(64),
            model: "other-model".to_string(),
        }))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let err = querying.retrieve("How old is Alice?", 1).await.unwrap_err();
    match err {
        RagError::ModelMismatch { expected, actual } => {
            assert_eq!(expected, "lexical-hash-64");
            assert_eq!(actual, "other-model");
        }
        other => panic!("expected ModelMismatch, got {other:?}"),
    }

    let err = querying.ingest(&Document::new("more", "Bob is 25.")).await.unwrap_err();
    assert!(matches!(err, RagError::ModelMismatch { .. }));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_wrong_dimensions_are_rejected() {
    let store = InMemoryVectorStore::new("m", 3);
    let err = store
        .insert(vec![
            (passage(0), EmbeddingVector::new("m", vec![1.0, 0.0, 0.0])),
            (passage(1), EmbeddingVector::new("m", vec![1.0, 0.0])),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_failed_ingestion_leaves_index_untouched() {
    let pipeline = pipeline_with(
        small_config(),
        Arc::new(PoisonedEmbedder { inner: LexicalHashEmbedder::default() }),
    );
    pipeline.ingest(&Document::new("clean", "Alice is 30 years old.")).await.unwrap();
    let before = pipeline.vector_store().len().await;

    let err = pipeline
        .ingest(&Document::new("bad", "This part is fine. But this has poison in it."))
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::EmbeddingFailure { .. }));
    assert_eq!(pipeline.vector_store().len().await, before);
    let results = pipeline.retrieve("fine part", 10).await.unwrap();
    assert!(results.iter().all(|r| r.passage.document_id == "clean"));
}

#[tokio::test]
async fn test_batch_ingestion_stops_at_failing_document() {
    let pipeline = pipeline_with(
        small_config(),
        Arc::new(PoisonedEmbedder { inner: LexicalHashEmbedder::default() }),
    );
    let documents = vec![
        Document::new("a", "Alice is 30 years old."),
        Document::new("b", "poison"),
        Document::new("c", "Carol is 41 years old."),
    ];

    assert!(pipeline.ingest_batch(&documents).await.is_err());

    let results = pipeline.retrieve("years old", 10).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.passage.document_id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
}

#[tokio::test]
async fn test_reingesting_a_document_is_idempotent() {
    let pipeline = pipeline_with(small_config(), Arc::new(LexicalHashEmbedder::default()));
    let doc = Document::new("people", "Alice is 30 years old. Bob is 25 years old.");

    let first = pipeline.ingest(&doc).await.unwrap();
    let second = pipeline.ingest(&doc).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(pipeline.vector_store().len().await, first.len());
}

#[tokio::test(start_paused = true)]
async fn test_embedding_timeout_is_embedding_failure() {
    let config = RagConfig::builder().embed_timeout(Duration::from_secs(1)).build().unwrap();
    let pipeline = pipeline_with(config, Arc::new(StalledEmbedder));

    let err = pipeline.ingest(&Document::new("d", "some text")).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingFailure { .. }));

    let err = pipeline.retrieve("some text", 1).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingFailure { .. }));
    assert!(pipeline.vector_store().is_empty().await);
}

#[tokio::test]
async fn test_provider_errors_are_reported_as_embedding_failures() {
    let pipeline = pipeline_with(RagConfig::default(), Arc::new(BrokenEmbedder));

    match pipeline.retrieve("hello", 1).await.unwrap_err() {
        RagError::EmbeddingFailure { provider, message } => {
            assert_eq!(provider, "broken");
            assert!(message.contains("socket closed"));
        }
        other => panic!("expected EmbeddingFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_similarity_threshold_filters_weak_matches() {
    let config = RagConfig::builder()
        .max_length(25)
        .overlap(0)
        .similarity_threshold(0.99)
        .build()
        .unwrap();
    let pipeline = pipeline_with(config, Arc::new(LexicalHashEmbedder::default()));
    pipeline
        .ingest(&Document::new("people", "Alice is 30 years old. Bob is 25 years old."))
        .await
        .unwrap();

    assert!(pipeline.retrieve("Alice", 5).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingest_and_retrieve() {
    let pipeline = Arc::new(pipeline_with(
        RagConfig::builder().max_length(64).overlap(8).build().unwrap(),
        Arc::new(LexicalHashEmbedder::default()),
    ));
    pipeline.ingest(&Document::new("seed", "The index starts with this passage.")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let text = format!("Document number {i} talks about topic {i}. It has two sentences.");
            pipeline.ingest(&Document::new(format!("doc{i}"), text)).await.unwrap();
            pipeline.retrieve("topic", 3).await.unwrap()
        }));
    }

    for handle in handles {
        let results = handle.await.unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 3);
    }

    let everything = pipeline.retrieve("passage document topic", 1000).await.unwrap();
    let documents: std::collections::HashSet<&str> =
        everything.iter().map(|r| r.passage.document_id.as_str()).collect();
    assert_eq!(documents.len(), 9);
}
