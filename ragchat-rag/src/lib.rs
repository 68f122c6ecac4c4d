//! # ragchat-rag
//!
//! A minimal retrieval-augmented chat loop.
//!
//! ## Overview
//!
//! Documents are split into [`Passage`]s by a [`Chunker`], embedded by an
//! [`EmbeddingProvider`], and stored in a [`VectorStore`] bound to that
//! provider's model. A [`ChatSession`] answers each user message by
//! retrieving the closest passages through the [`RagPipeline`] and handing
//! them to a [`Generator`], which prompts an [`Llm`].
//!
//! ## Providers
//!
//! | Provider | Embedding | Generation | Feature |
//! |----------|-----------|------------|---------|
//! | Lexical hash | [`LexicalHashEmbedder`] | | always |
//! | Mock | | [`MockLlm`] | always |
//! | Gemini | `GeminiEmbeddingProvider` | `GeminiModel` | `gemini` |
//! | Ollama | `OllamaEmbeddingProvider` | `OllamaModel` | `ollama` |
//! | OpenAI | `OpenAIEmbeddingProvider` | `OpenAIChatModel` | `openai` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ragchat_rag::{
//!     ChatSession, Document, Generator, LexicalHashEmbedder, MockLlm, RagConfig, RagPipeline,
//! };
//!
//! # async fn run() -> ragchat_rag::Result<()> {
//! let config = RagConfig::builder().max_length(25).overlap(0).top_k(1).build()?;
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(config.clone())
//!         .embedding_provider(Arc::new(LexicalHashEmbedder::default()))
//!         .build()?,
//! );
//! pipeline.ingest(&Document::new("people", "Alice is 30 years old. Bob is 25 years old.")).await?;
//!
//! let generator = Arc::new(Generator::new(Arc::new(MockLlm::context()), config.generate_timeout));
//! let mut session = ChatSession::new(pipeline, generator);
//! let outcome = session.submit("How old is Alice?").await?;
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod hash;
pub mod inmemory;
pub mod llm;
pub mod loader;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod session;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, SentenceChunker, stitch};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Document, EmbeddingVector, Passage, ScoredPassage};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiModel};
pub use generation::{Generator, build_prompt};
pub use hash::LexicalHashEmbedder;
pub use inmemory::InMemoryVectorStore;
pub use llm::Llm;
pub use loader::{DocumentLoader, TextFileLoader};
pub use mock::MockLlm;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbeddingProvider, OllamaModel};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use session::{
    ChatSession, ConversationLog, ConversationTurn, ErrorMarker, LogEntry, Role, SessionState,
    TurnOutcome,
};
pub use vectorstore::VectorStore;
