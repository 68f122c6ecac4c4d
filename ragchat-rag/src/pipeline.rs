//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates ingestion and retrieval by composing an
//! [`EmbeddingProvider`], a [`VectorStore`], and a [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat_rag::{RagPipeline, RagConfig, LexicalHashEmbedder};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(LexicalHashEmbedder::default()))
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! let results = pipeline.query("search query").await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, SentenceChunker};
use crate::config::RagConfig;
use crate::document::{Document, EmbeddingVector, Passage, ScoredPassage};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and retrieval
/// (embed → search → filter). Construct one via [`RagPipeline::builder()`].
/// A pipeline is shared between chat sessions behind an `Arc`.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// Returns the passages that were stored with their embeddings. Either
    /// every passage of the document reaches the index or none does.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if the document text is blank.
    /// - [`RagError::EmbeddingFailure`] if any embedding call fails or times out.
    /// - [`RagError::ModelMismatch`] / [`RagError::DimensionMismatch`] if the
    ///   provider's vectors do not fit the index.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<(Passage, EmbeddingVector)>> {
        if document.text.trim().is_empty() {
            return Err(RagError::InvalidInput(format!(
                "document '{}' has no text to ingest",
                document.id
            )));
        }

        // 1. Chunk the document
        let passages = self.chunker.chunk(document);

        // 2. Embed every passage before touching the index
        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        let embeddings =
            self.bounded(self.embedding_provider.embed_batch(&texts)).await.map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                e
            })?;

        if embeddings.len() != passages.len() {
            return Err(RagError::embedding(
                self.embedding_provider.model_id(),
                format!("expected {} embeddings, got {}", passages.len(), embeddings.len()),
            ));
        }

        // 3. Tag vectors with the producing model
        let model = self.embedding_provider.model_id();
        let entries: Vec<(Passage, EmbeddingVector)> = passages
            .into_iter()
            .zip(embeddings)
            .map(|(passage, values)| (passage, EmbeddingVector::new(model, values)))
            .collect();

        // 4. Commit the whole batch at once
        self.vector_store.insert(entries.clone()).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "insert failed during ingestion");
            e
        })?;

        info!(document.id = %document.id, passage_count = entries.len(), "ingested document");

        Ok(entries)
    }

    /// Ingest multiple documents through the chunk → embed → store workflow.
    ///
    /// Documents are committed one at a time; on error, documents before the
    /// failing one stay in the index and the failing one leaves no trace.
    pub async fn ingest_batch(
        &self,
        documents: &[Document],
    ) -> Result<Vec<(Passage, EmbeddingVector)>> {
        let mut all = Vec::new();
        for document in documents {
            all.extend(self.ingest(document).await?);
        }
        Ok(all)
    }

    /// Retrieve the `k` passages most similar to `query`.
    ///
    /// Results are ordered by descending score, ties in ingestion order, and
    /// filtered by the configured `similarity_threshold`. An empty index
    /// yields an empty `Vec`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `query` is blank or `k` is zero.
    /// - [`RagError::EmbeddingFailure`] if the query cannot be embedded in time.
    /// - [`RagError::ModelMismatch`] if the provider's model differs from the index's.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        if k == 0 {
            return Err(RagError::InvalidInput("k must be at least 1".to_string()));
        }

        // 1. Embed the query
        let query_embedding =
            self.bounded(self.embedding_provider.embed_tagged(query)).await.map_err(|e| {
                error!(error = %e, "embedding failed during query");
                e
            })?;

        // 2. Search the index
        let results = self.vector_store.search(&query_embedding, k).await.map_err(|e| {
            error!(error = %e, "vector store search failed");
            e
        })?;

        // 3. Filter by similarity threshold
        let results: Vec<ScoredPassage> = match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        info!(result_count = results.len(), k, "retrieval completed");

        Ok(results)
    }

    /// Retrieve with the configured `top_k`.
    pub async fn query(&self, query: &str) -> Result<Vec<ScoredPassage>> {
        self.retrieve(query, self.config.top_k).await
    }

    /// Run an embedding call under the configured timeout, reporting every
    /// failure as [`RagError::EmbeddingFailure`].
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let provider = self.embedding_provider.model_id();
        match tokio::time::timeout(self.config.embed_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure @ RagError::EmbeddingFailure { .. })) => Err(failure),
            Ok(Err(other)) => Err(RagError::embedding(provider, other.to_string())),
            Err(_) => Err(RagError::embedding(
                provider,
                format!("no response within {:?}", self.config.embed_timeout),
            )),
        }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config` and `embedding_provider` are required. Without an explicit
/// vector store the pipeline gets an [`InMemoryVectorStore`] bound to the
/// provider's model; without an explicit chunker it uses a
/// [`SentenceChunker`] sized from the config.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))        // optional
///     .chunker(Arc::new(chunker))           // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self.vector_store.unwrap_or_else(|| {
            Arc::new(InMemoryVectorStore::for_provider(embedding_provider.as_ref()))
        });
        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(SentenceChunker::new(config.max_length, config.overlap)));

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker })
    }
}
