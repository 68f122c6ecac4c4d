//! The embedding capability.

use async_trait::async_trait;

use crate::document::EmbeddingVector;
use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// Implementations must be deterministic for a given model: the same text
/// embeds to the same vector. Every vector a provider returns has
/// [`dimensions`](Self::dimensions) values and belongs to
/// [`model_id`](Self::model_id).
///
/// ```rust,ignore
/// use ragchat_rag::{EmbeddingProvider, LexicalHashEmbedder};
///
/// let provider = LexicalHashEmbedder::new(64);
/// let vector = provider.embed_tagged("hello world").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// assert_eq!(vector.model, provider.model_id());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    ///
    /// Falls back to one [`embed`](Self::embed) call per text. Backends
    /// with a batch endpoint override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;

    /// Identity of the model behind this provider.
    ///
    /// An index accepts only vectors carrying the model id it was built with.
    fn model_id(&self) -> &str;

    /// Embed `text` and tag the result with [`model_id`](Self::model_id).
    async fn embed_tagged(&self, text: &str) -> Result<EmbeddingVector> {
        let values = self.embed(text).await?;
        Ok(EmbeddingVector::new(self.model_id(), values))
    }
}
