//! Vector store trait for storing and searching passage embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddingVector, Passage, ScoredPassage};
use crate::error::Result;

/// A queryable index of passages and their embeddings.
///
/// An index is bound to one embedding model and one dimensionality for its
/// whole life. Every vector handed to [`insert`](VectorStore::insert) or
/// [`search`](VectorStore::search) is checked against both.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new("llama3", 4096);
/// store.insert(entries).await?;
/// let results = store.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The embedding model this index was built for.
    fn model_id(&self) -> &str;

    /// The vector length this index accepts.
    fn dimensions(&self) -> usize;

    /// Number of passages currently stored.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Add passages with their embeddings.
    ///
    /// The batch is all-or-nothing: if any vector is rejected, nothing is
    /// stored, and concurrent readers see either none or all of the batch.
    /// Inserting an existing passage ID replaces that entry in place.
    async fn insert(&self, entries: Vec<(Passage, EmbeddingVector)>) -> Result<()>;

    /// Return up to `top_k` passages most similar to `query`.
    ///
    /// Results are ordered by descending score; equal scores keep insertion
    /// order. An empty index yields an empty `Vec`.
    async fn search(&self, query: &EmbeddingVector, top_k: usize) -> Result<Vec<ScoredPassage>>;
}
