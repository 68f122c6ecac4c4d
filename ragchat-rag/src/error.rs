//! Error types for the `ragchat-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding capability was unreachable, timed out, or rejected the input.
    #[error("Embedding failure ({provider}): {message}")]
    EmbeddingFailure {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation capability was unreachable, timed out, or rejected the prompt.
    #[error("Generation failure ({provider}): {message}")]
    GenerationFailure {
        /// The model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector was produced by a different embedding model than the index was built with.
    #[error("Model mismatch: index holds '{expected}' embeddings, got '{actual}'")]
    ModelMismatch {
        /// The model the index was built with.
        expected: String,
        /// The model that produced the offending vector.
        actual: String,
    },

    /// A vector's length does not match the index dimensionality.
    #[error("Dimension mismatch: index expects {expected} dimensions, got {actual}")]
    DimensionMismatch {
        /// The dimensionality recorded by the index.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// The caller passed an argument the operation cannot accept.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A document could not be loaded from its source.
    #[error("Failed to load '{path}': {message}")]
    Load {
        /// The path that was being read.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A message was submitted to a session that has been closed.
    #[error("Session is closed")]
    SessionClosed,

    /// An I/O error from the line-oriented front end.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailure { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationFailure { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
