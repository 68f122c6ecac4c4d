//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is the index used by
//! the chat loop; nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::document::{EmbeddingVector, Passage, ScoredPassage};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// An in-memory vector store using cosine similarity for search.
///
/// Entries are keyed by passage ID. Each entry remembers the sequence number
/// of its first insertion, which breaks ties between equal scores.
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::InMemoryVectorStore;
///
/// let store = InMemoryVectorStore::for_provider(embedder.as_ref());
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    model_id: String,
    dimensions: usize,
    state: RwLock<IndexState>,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    passage: Passage,
    embedding: EmbeddingVector,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of `dimensions` produced by `model_id`.
    pub fn new(model_id: impl Into<String>, dimensions: usize) -> Self {
        Self { model_id: model_id.into(), dimensions, state: RwLock::new(IndexState::default()) }
    }

    /// Create an empty store matching the provider's model and dimensionality.
    pub fn for_provider(provider: &dyn EmbeddingProvider) -> Self {
        Self::new(provider.model_id(), provider.dimensions())
    }

    fn check(&self, vector: &EmbeddingVector) -> Result<()> {
        if vector.model != self.model_id {
            return Err(RagError::ModelMismatch {
                expected: self.model_id.clone(),
                actual: vector.model.clone(),
            });
        }
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.values.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvalidInput(format!(
                "embedding from model {} contains NaN or infinite values",
                vector.model
            )));
        }
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    async fn insert(&self, entries: Vec<(Passage, EmbeddingVector)>) -> Result<()> {
        // Validate the whole batch before taking the write lock.
        for (_, embedding) in &entries {
            self.check(embedding)?;
        }

        let count = entries.len();
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        for (passage, embedding) in entries {
            match state.entries.get_mut(&passage.id) {
                Some(existing) => {
                    existing.passage = passage;
                    existing.embedding = embedding;
                }
                None => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    state.entries.insert(passage.id.clone(), Entry { seq, passage, embedding });
                }
            }
        }
        debug!(count, total = state.entries.len(), "inserted passages");
        Ok(())
    }

    async fn search(&self, query: &EmbeddingVector, top_k: usize) -> Result<Vec<ScoredPassage>> {
        self.check(query)?;

        let state = self.state.read().await;
        if state.entries.is_empty() {
            warn!(model = %self.model_id, "retrieval against an empty index");
            return Ok(Vec::new());
        }

        let mut scored: Vec<(u64, ScoredPassage)> = state
            .entries
            .values()
            .map(|entry| {
                let score = cosine_similarity(&entry.embedding.values, &query.values);
                (entry.seq, ScoredPassage { passage: entry.passage.clone(), score })
            })
            .collect();
        drop(state);

        scored.sort_by(|(seq_a, a), (seq_b, b)| {
            b.score.total_cmp(&a.score).then(seq_a.cmp(seq_b))
        });
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, result)| result).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str) -> Passage {
        Passage {
            id: id.to_string(),
            document_id: "doc".to_string(),
            index: 0,
            text: id.to_string(),
            start: 0,
            end: id.len(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimensions() {
        let store = InMemoryVectorStore::new("m", 2);
        let err = store
            .insert(vec![(passage("a"), EmbeddingVector::new("m", vec![1.0, 0.0, 0.0]))])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reinsert_keeps_original_position() {
        let store = InMemoryVectorStore::new("m", 2);
        store
            .insert(vec![
                (passage("a"), EmbeddingVector::new("m", vec![1.0, 0.0])),
                (passage("b"), EmbeddingVector::new("m", vec![1.0, 0.0])),
            ])
            .await
            .unwrap();
        store
            .insert(vec![(passage("a"), EmbeddingVector::new("m", vec![1.0, 0.0]))])
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        let results = store.search(&EmbeddingVector::new("m", vec![1.0, 0.0]), 2).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.passage.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_rejects_non_finite_values() {
        let store = InMemoryVectorStore::new("m", 2);
        store
            .insert(vec![(passage("a"), EmbeddingVector::new("m", vec![1.0, 0.0]))])
            .await
            .unwrap();

        let err = store
            .insert(vec![
                (passage("b"), EmbeddingVector::new("m", vec![0.5, 0.5])),
                (passage("c"), EmbeddingVector::new("m", vec![f32::NAN, 1.0])),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
        assert_eq!(store.len().await, 1);

        let query = EmbeddingVector::new("m", vec![f32::INFINITY, 0.0]);
        assert!(matches!(store.search(&query, 1).await, Err(RagError::InvalidInput(_))));
    }

    #[test]
    fn test_overflowing_similarity_is_zero() {
        assert_eq!(cosine_similarity(&[f32::MAX, f32::MAX], &[f32::MAX, f32::MAX]), 0.0);
    }
}
