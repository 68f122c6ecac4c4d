//! # ragchat-cli
//!
//! The `ragchat` command: load files, index them, and chat about them.
//!
//! ```bash
//! # Offline: lexical embeddings, replies show the retrieved context
//! ragchat chat --file notes.md
//!
//! # Local models through Ollama
//! ragchat chat --file notes.md --file faq.txt --config ragchat.toml
//!
//! # Gemini with GOOGLE_API_KEY from a .env file
//! ragchat chat --file notes.md --config gemini.toml --env-file secrets.env
//!
//! # Just index and report
//! ragchat ingest --file notes.md --max-length 200 --show-passages
//! ```

pub mod cli;
pub mod console;
pub mod providers;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ragchat_rag::{
    Document, DocumentLoader, EmbeddingVector, Generator, Passage, RagPipeline, TextFileLoader,
};
use tracing::info;

pub use cli::{Cli, Command};
pub use settings::{Overrides, Settings};

/// Load environment variables from `path`, or from a `.env` file in the
/// working directory or its parents when no path is given.
///
/// Variables already set in the process environment are kept. A missing
/// `.env` is not an error; a missing explicit file is. Returns the file
/// that was read, if any.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to read env file: {}", path.display()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => Ok(dotenvy::dotenv().ok()),
    }
}

/// Load every file, failing on the first one that cannot be read.
pub async fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let loader = TextFileLoader;
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(loader.load(path).await?);
    }
    Ok(documents)
}

/// Build a pipeline from `settings` and ingest `documents` into it.
///
/// Returns the pipeline and the passages stored for each document, in order.
pub async fn build_index(
    settings: &Settings,
    documents: &[Document],
) -> Result<(Arc<RagPipeline>, Vec<Vec<(Passage, EmbeddingVector)>>)> {
    let config = settings.rag_config()?;
    let embedder = providers::build_embedder(&settings.embedding)?;
    let pipeline = RagPipeline::builder().config(config).embedding_provider(embedder).build()?;

    let mut stored = Vec::with_capacity(documents.len());
    for document in documents {
        let entries = pipeline
            .ingest(document)
            .await
            .with_context(|| format!("Failed to index '{}'", document.id))?;
        stored.push(entries);
    }
    let passages = pipeline.vector_store().len().await;
    info!(documents = documents.len(), passages, "index ready");

    Ok((Arc::new(pipeline), stored))
}

/// The generator named in `settings`, bounded by the configured timeout.
pub fn build_generator(settings: &Settings) -> Result<Arc<Generator>> {
    let config = settings.rag_config()?;
    let llm = providers::build_llm(&settings.generation)?;
    Ok(Arc::new(Generator::new(llm, config.generate_timeout)))
}

/// One-line summary per document, optionally followed by its passages.
pub fn ingest_report(
    documents: &[Document],
    stored: &[Vec<(Passage, EmbeddingVector)>],
    show_passages: bool,
) -> String {
    let mut report = String::new();
    for (document, entries) in documents.iter().zip(stored) {
        let dimensions = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        let model = entries.first().map(|(_, v)| v.model.as_str()).unwrap_or("-");
        report.push_str(&format!(
            "{}: {} chars, {} passages, {} x {} ({})\n",
            document.id,
            document.text.chars().count(),
            entries.len(),
            entries.len(),
            dimensions,
            model,
        ));
        if show_passages {
            for (passage, _) in entries {
                report.push_str(&format!(
                    "  [{}] {}..{} {:?}\n",
                    passage.index, passage.start, passage.end, passage.text
                ));
            }
        }
    }
    report
}
