//! The `ragchat.toml` settings file.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [rag]
//! max_length = 512
//! overlap = 64
//! top_k = 4
//! similarity_threshold = 0.2
//! embed_timeout_secs = 30
//! generate_timeout_secs = 120
//!
//! [embedding]
//! provider = "ollama"            # hash | ollama | openai | gemini
//! model = "nomic-embed-text"
//! dimensions = 768
//! base_url = "http://localhost:11434"
//!
//! [generation]
//! provider = "openai"            # echo | ollama | openai | gemini
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! temperature = 0.2
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ragchat_rag::RagConfig;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rag: RagSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

/// Retrieval parameters. Missing keys take the library defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RagSettings {
    pub max_length: usize,
    pub overlap: usize,
    pub top_k: usize,
    pub similarity_threshold: Option<f32>,
    pub embed_timeout_secs: u64,
    pub generate_timeout_secs: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        let config = RagConfig::default();
        Self {
            max_length: config.max_length,
            overlap: config.overlap,
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
            embed_timeout_secs: config.embed_timeout.as_secs(),
            generate_timeout_secs: config.generate_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Offline lexical hashing.
    #[default]
    Hash,
    Ollama,
    OpenAI,
    Gemini,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: Option<usize>,
    /// Environment variable holding the API key (OpenAI and Gemini).
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// Replies with the retrieved context; needs no model.
    #[default]
    Echo,
    Ollama,
    OpenAI,
    Gemini,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSettings {
    pub provider: GenerationBackend,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key (OpenAI and Gemini).
    pub api_key_env: Option<String>,
    pub temperature: Option<f32>,
}

/// Values given on the command line, which win over the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub top_k: Option<usize>,
    pub max_length: Option<usize>,
    pub overlap: Option<usize>,
}

impl Settings {
    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Read `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        if let Some(t) = settings.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!("generation.temperature must be in [0.0, 2.0], got {t}");
            }
        }
        if settings.embedding.dimensions == Some(0) {
            anyhow::bail!("embedding.dimensions must be > 0");
        }
        Ok(settings)
    }

    /// Apply command-line values.
    ///
    /// A `--max-length` at or below the inherited overlap shrinks the overlap
    /// to an eighth of the new length unless `--overlap` is also given.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(top_k) = overrides.top_k {
            self.rag.top_k = top_k;
        }
        if let Some(max_length) = overrides.max_length {
            self.rag.max_length = max_length;
            if overrides.overlap.is_none() && self.rag.overlap >= max_length {
                let overlap = max_length / 8;
                warn!(from = self.rag.overlap, to = overlap, max_length, "shrinking overlap");
                self.rag.overlap = overlap;
            }
        }
        if let Some(overlap) = overrides.overlap {
            self.rag.overlap = overlap;
        }
    }

    /// The validated library configuration.
    pub fn rag_config(&self) -> Result<RagConfig> {
        let rag = &self.rag;
        let mut builder = RagConfig::builder()
            .max_length(rag.max_length)
            .overlap(rag.overlap)
            .top_k(rag.top_k)
            .embed_timeout(Duration::from_secs(rag.embed_timeout_secs))
            .generate_timeout(Duration::from_secs(rag.generate_timeout_secs));
        if let Some(threshold) = rag.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        Ok(builder.build()?)
    }
}
