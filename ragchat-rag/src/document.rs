//! Data types for documents, passages, embeddings, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document (e.g. `source`, `page`).
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Record where the text was read from.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A contiguous slice of a [`Document`]'s text.
///
/// `start` and `end` are byte offsets into the parent document's text, so
/// `text == document.text[start..end]` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this passage within its document.
    pub index: usize,
    /// The passage text.
    pub text: String,
    /// Byte offset of the first character in the parent text.
    pub start: usize,
    /// Byte offset one past the last character in the parent text.
    pub end: usize,
    /// Metadata inherited from the parent document plus `passage_index`.
    pub metadata: HashMap<String, String>,
}

/// A fixed-length vector produced by a named embedding model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingVector {
    /// Identity of the model that produced the values.
    pub model: String,
    /// The embedding values.
    pub values: Vec<f32>,
}

impl EmbeddingVector {
    /// Tag `values` as produced by `model`.
    pub fn new(model: impl Into<String>, values: Vec<f32>) -> Self {
        Self { model: model.into(), values }
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no dimensions.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A retrieved [`Passage`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// The retrieved passage.
    pub passage: Passage,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}
