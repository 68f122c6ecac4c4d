//! OpenAI embedding and chat providers.
//!
//! Only compiled with the `openai` feature. Both providers talk to the REST
//! API through `reqwest` and share one [`ApiClient`], so pointing them at
//! any OpenAI-compatible server (vLLM, LM Studio, llama.cpp) is a matter of
//! [`with_base_url`](OpenAIChatModel::with_base_url).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::Llm;

/// Where requests go unless a base URL is given.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Width of `text-embedding-3-small` vectors.
const DEFAULT_DIMENSIONS: usize = 1536;

const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Authenticated HTTP access shared by both providers.
struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    fn new(api_key: String) -> std::result::Result<Self, &'static str> {
        if api_key.trim().is_empty() {
            return Err("API key must not be empty");
        }
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: OPENAI_BASE_URL.into() })
    }

    fn set_base_url(&mut self, base_url: String) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    /// POST `body` to `{base_url}/{path}` and decode the JSON reply.
    ///
    /// Failures come back as plain messages; callers pick the error kind.
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
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

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Embeddings from `/embeddings`.
///
/// Defaults to `text-embedding-3-small` (1536 dimensions). Setting
/// [`with_dimensions`](Self::with_dimensions) asks the API for shortened
/// vectors and changes what [`dimensions`](EmbeddingProvider::dimensions)
/// reports.
///
/// ```rust,ignore
/// use ragchat_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?.with_dimensions(512);
/// let vector = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    api: ApiClient,
    model: String,
    dimensions: usize,
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api = ApiClient::new(api_key.into()).map_err(|m| RagError::embedding("OpenAI", m))?;
        Ok(Self {
            api,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            requested_dimensions: None,
        })
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_VAR).map_err(|_| {
            RagError::embedding("OpenAI", format!("{API_KEY_VAR} environment variable not set"))
        })?;
        Self::new(key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url.into());
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self.requested_dimensions = Some(dimensions);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::embedding("OpenAI", "API returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "OpenAI", model = %self.model, batch_size = texts.len(), "embedding");

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };
        let response: EmbeddingResponse =
            self.api.post("embeddings", &request).await.map_err(|message| {
                error!(provider = "OpenAI", %message, "embedding request failed");
                RagError::embedding("OpenAI", message)
            })?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Completions from `/chat/completions`.
///
/// The prompt goes out as a single user message; the first choice's text
/// is the answer.
pub struct OpenAIChatModel {
    api: ApiClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIChatModel {
    /// Defaults to `gpt-4o-mini`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api = ApiClient::new(api_key.into()).map_err(|m| RagError::generation("OpenAI", m))?;
        Ok(Self { api, model: DEFAULT_CHAT_MODEL.into(), temperature: None })
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_VAR).map_err(|_| {
            RagError::generation("OpenAI", format!("{API_KEY_VAR} environment variable not set"))
        })?;
        Self::new(key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl Llm for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = "OpenAI", model = %self.model, prompt_len = prompt.len(), "completion");

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };
        let response: ChatResponse =
            self.api.post("chat/completions", &request).await.map_err(|message| {
                error!(provider = "OpenAI", %message, "completion request failed");
                RagError::generation(&self.model, message)
            })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::generation(&self.model, "API returned no content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_rejected() {
        assert!(matches!(
            OpenAIEmbeddingProvider::new("  "),
            Err(RagError::EmbeddingFailure { .. })
        ));
        assert!(matches!(OpenAIChatModel::new(""), Err(RagError::GenerationFailure { .. })));
    }

    #[test]
    fn test_embedding_overrides() {
        let provider = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_model("nomic-embed-text")
            .with_base_url("http://localhost:8080/v1/")
            .with_dimensions(768);
        assert_eq!(provider.model_id(), "nomic-embed-text");
        assert_eq!(provider.dimensions(), 768);
        assert_eq!(provider.api.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage { role: "user", content: "hi" }],
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_generation_failure() {
        let model = OpenAIChatModel::new("sk-test").unwrap().with_base_url("http://127.0.0.1:1");
        let err = model.complete("hello").await.unwrap_err();
        assert!(matches!(err, RagError::GenerationFailure { .. }));
    }
}
