//! Gemini embedding and generation providers.
//!
//! This module is only available when the `gemini` feature is enabled. It
//! calls the Generative Language REST API (`:batchEmbedContents` and
//! `:generateContent`) with the key in the `x-goog-api-key` header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::Llm;

/// Public Generative Language API endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";

/// Width of `text-embedding-004` vectors.
const DEFAULT_DIMENSIONS: usize = 768;

/// Environment variables checked for the key, in order.
const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// How the embedding will be used; Gemini tunes vectors per task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[default]
    RetrievalDocument,
    RetrievalQuery,
    SemanticSimilarity,
}

fn key_from_env() -> Option<String> {
    API_KEY_VARS.iter().find_map(|var| std::env::var(var).ok())
}

fn missing_key() -> String {
    format!("{} or {} must be set", API_KEY_VARS[0], API_KEY_VARS[1])
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Shared request plumbing for both providers.
struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    fn new(api_key: String) -> std::result::Result<Self, &'static str> {
        if api_key.trim().is_empty() {
            return Err("API key must not be empty");
        }
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: GEMINI_BASE_URL.into() })
    }

    /// POST to `{base_url}/models/{model}:{method}`.
    async fn call<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        model: &str,
        method: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let response = self
            .http
            .post(format!("{}/models/{model}:{method}", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

/// An [`EmbeddingProvider`] backed by Gemini's batch embedding endpoint.
///
/// Defaults to `text-embedding-004` (768 dimensions) and the
/// `RETRIEVAL_DOCUMENT` task type.
///
/// ```rust,ignore
/// use ragchat_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::from_env()?;
/// let vector = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    task_type: TaskType,
    dimensions: usize,
    output_dimensionality: Option<usize>,
}

impl GeminiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client =
            GeminiClient::new(api_key.into()).map_err(|m| RagError::embedding("Gemini", m))?;
        Ok(Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            task_type: TaskType::default(),
            dimensions: DEFAULT_DIMENSIONS,
            output_dimensionality: None,
        })
    }

    /// Read the key from `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = key_from_env().ok_or_else(|| RagError::embedding("Gemini", missing_key()))?;
        Self::new(key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Ask for truncated vectors of `dimensions` values.
    pub fn with_output_dimensionality(mut self, dimensions: usize) -> Self {
        self.output_dimensionality = Some(dimensions);
        self.dimensions = dimensions;
        self
    }

    fn request<'a>(&self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content { role: None, parts: [Part { text }] },
            task_type: self.task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::embedding("Gemini", "API returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "Gemini", model = %self.model, batch_size = texts.len(), "embedding");

        let body = BatchEmbedRequest { requests: texts.iter().map(|t| self.request(t)).collect() };
        let response: BatchEmbedResponse =
            self.client.call(&self.model, "batchEmbedContents", &body).await.map_err(
                |message| {
                    error!(provider = "Gemini", %message, "embedding request failed");
                    RagError::embedding("Gemini", message)
                },
            )?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::embedding(
                "Gemini",
                format!("expected {} embeddings, got {}", texts.len(), response.embeddings.len()),
            ));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// An [`Llm`] backed by Gemini's `generateContent` endpoint.
///
/// Defaults to `gemini-2.0-flash`. The reply is the text of the first
/// candidate, with its parts concatenated.
pub struct GeminiModel {
    client: GeminiClient,
    model: String,
    temperature: Option<f32>,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client =
            GeminiClient::new(api_key.into()).map_err(|m| RagError::generation("Gemini", m))?;
        Ok(Self { client, model: DEFAULT_GENERATION_MODEL.into(), temperature: None })
    }

    /// Read the key from `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = key_from_env().ok_or_else(|| RagError::generation("Gemini", missing_key()))?;
        Self::new(key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Gemini", model = %self.model, prompt_len = prompt.len(), "completion");

        let body = GenerateContentRequest {
            contents: [Content { role: Some("user"), parts: [Part { text: prompt }] }],
            generation_config: self.temperature.map(|temperature| GenerationConfig { temperature }),
        };
        let response: GenerateContentResponse =
            self.client.call(&self.model, "generateContent", &body).await.map_err(|message| {
                error!(provider = "Gemini", %message, "completion request failed");
                RagError::generation(&self.model, message)
            })?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect::<String>())
            .ok_or_else(|| RagError::generation(&self.model, "API returned no candidates"))
    }
}
