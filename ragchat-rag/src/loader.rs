//! Document sources.
//!
//! Loaders turn a path into a [`Document`]. Parsing binary formats is left
//! to other loaders; [`TextFileLoader`] reads UTF-8 text as-is.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Produces a [`Document`] from a file path.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Document>;
}

/// Loads plain-text and markdown files.
///
/// The document ID is the file stem and the `source` metadata entry holds
/// the path as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFileLoader;

#[async_trait]
impl DocumentLoader for TextFileLoader {
    async fn load(&self, path: &Path) -> Result<Document> {
        let source = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::Load { path: source.clone(), message: e.to_string() })?;
        let text = String::from_utf8(bytes).map_err(|_| RagError::Load {
            path: source.clone(),
            message: "file is not valid UTF-8 text".to_string(),
        })?;

        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());

        debug!(path = %source, bytes = text.len(), "loaded document");

        Ok(Document::new(id, text)
            .with_metadata("source", source.clone())
            .with_source_uri(source))
    }
}
