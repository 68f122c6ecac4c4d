//! Offline lexical embedder.
//!
//! [`LexicalHashEmbedder`] maps text to a bag-of-words vector using feature
//! hashing. It needs no model or network and ranks passages by shared
//! vocabulary, which is enough for tests and small keyword-heavy corpora.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

const DEFAULT_DIMENSIONS: usize = 512;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic feature-hashing embedder.
///
/// Each lowercase alphanumeric token adds 1.0 to bucket `fnv1a(token) % dimensions`;
/// the result is L2-normalised. Text without tokens embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct LexicalHashEmbedder {
    dimensions: usize,
    model_id: String,
}

impl LexicalHashEmbedder {
    /// Create an embedder with `dimensions` buckets (at least 1).
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self { dimensions, model_id: format!("lexical-hash-{dimensions}") }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            values[bucket] += 1.0;
        }
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|x| *x /= norm);
        }
        values
    }
}

impl Default for LexicalHashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl EmbeddingProvider for LexicalHashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
