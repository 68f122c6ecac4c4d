//! Ollama embedding and generation providers.
//!
//! This module is only available when the `ollama` feature is enabled. It
//! talks to a local Ollama server over its REST API (`/api/embed` and
//! `/api/generate`, non-streaming).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::Llm;

/// Where a stock Ollama install listens.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

const DEFAULT_EMBEDDING_MODEL: &str = "llama3";
const DEFAULT_GENERATION_MODEL: &str = "gemma3:latest";

/// Embedding width of `llama3`.
const DEFAULT_DIMENSIONS: usize = 4096;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("server returned {status}: {detail}")
}

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// The endpoint accepts a batch of inputs, so ingestion makes one request
/// per document.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `llama3` on the local server.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: OLLAMA_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model and the width of the vectors it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

impl Default for OllamaEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("Ollama", "server returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Ollama",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest { model: &self.model, input: texts.to_vec() })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "request failed");
                RagError::embedding("Ollama", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "Ollama", %message, "embedding request rejected");
            return Err(RagError::embedding("Ollama", message));
        }

        let body: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse response");
            RagError::embedding("Ollama", format!("failed to parse response: {e}"))
        })?;

        Ok(body.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// An [`Llm`] backed by Ollama's `/api/generate` endpoint.
pub struct OllamaModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaModel {
    /// Create a model handle for `gemma3:latest` on the local server.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: OLLAMA_BASE_URL.into(),
            model: DEFAULT_GENERATION_MODEL.into(),
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Default for OllamaModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Llm for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Ollama", model = %self.model, prompt_len = prompt.len(), "generate");

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.temperature.map(|temperature| GenerateOptions { temperature }),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "request failed");
                RagError::generation(&self.model, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "Ollama", %message, "generate request rejected");
            return Err(RagError::generation(&self.model, message));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse response");
            RagError::generation(&self.model, format!("failed to parse response: {e}"))
        })?;

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_local_install() {
        let embedder = OllamaEmbeddingProvider::default();
        assert_eq!(embedder.model_id(), "llama3");
        assert_eq!(embedder.base_url, OLLAMA_BASE_URL);

        let model = OllamaModel::default().with_base_url("http://gpu-box:11434/");
        assert_eq!(model.name(), "gemma3:latest");
        assert_eq!(model.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_generate_request_is_non_streaming() {
        let request =
            GenerateRequest { model: "m", prompt: "p", stream: false, options: None };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert!(json.get("options").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_failure() {
        let embedder = OllamaEmbeddingProvider::new().with_base_url("http://127.0.0.1:1");
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailure { .. }));
    }
}
