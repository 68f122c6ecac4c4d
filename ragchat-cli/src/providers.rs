//! Builds the embedding and generation capabilities named in the settings.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ragchat_rag::{
    EmbeddingProvider, GeminiEmbeddingProvider, GeminiModel, LexicalHashEmbedder, Llm, MockLlm,
    OllamaEmbeddingProvider, OllamaModel, OpenAIChatModel, OpenAIEmbeddingProvider,
};
use tracing::{info, warn};

use crate::settings::{EmbeddingBackend, EmbeddingSettings, GenerationBackend, GenerationSettings};

const OPENAI_KEY_VARS: &[&str] = &["OPENAI_API_KEY"];
const GEMINI_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Read the key from `var` if configured, otherwise from the first set
/// variable in `defaults`.
fn api_key(var: Option<&str>, defaults: &[&str]) -> Result<String> {
    if let Some(var) = var {
        return std::env::var(var)
            .with_context(|| format!("environment variable {var} is not set"));
    }
    defaults
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .with_context(|| format!("environment variable {} is not set", defaults.join(" or ")))
}

/// Build the embedding provider named in the settings.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match settings.provider {
        EmbeddingBackend::Hash => {
            if settings.model.is_some() || settings.base_url.is_some() {
                warn!("embedding.model and embedding.base_url are ignored by the hash provider");
            }
            Arc::new(settings.dimensions.map(LexicalHashEmbedder::new).unwrap_or_default())
        }
        EmbeddingBackend::Ollama => {
            let mut provider = OllamaEmbeddingProvider::new();
            if let Some(base_url) = &settings.base_url {
                provider = provider.with_base_url(base_url);
            }
            match (&settings.model, settings.dimensions) {
                (Some(model), Some(dimensions)) => {
                    provider = provider.with_model(model, dimensions);
                }
                (None, None) => {}
                _ => bail!(
                    "embedding.model and embedding.dimensions must be set together for ollama"
                ),
            }
            Arc::new(provider)
        }
        EmbeddingBackend::OpenAI => {
            let key = api_key(settings.api_key_env.as_deref(), OPENAI_KEY_VARS)?;
            let mut provider = OpenAIEmbeddingProvider::new(key)?;
            if let Some(model) = &settings.model {
                provider = provider.with_model(model);
            }
            if let Some(base_url) = &settings.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(dimensions) = settings.dimensions {
                provider = provider.with_dimensions(dimensions);
            }
            Arc::new(provider)
        }
        EmbeddingBackend::Gemini => {
            let key = api_key(settings.api_key_env.as_deref(), GEMINI_KEY_VARS)?;
            let mut provider = GeminiEmbeddingProvider::new(key)?;
            if let Some(model) = &settings.model {
                provider = provider.with_model(model);
            }
            if let Some(base_url) = &settings.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(dimensions) = settings.dimensions {
                provider = provider.with_output_dimensionality(dimensions);
            }
            Arc::new(provider)
        }
    };

    info!(
        provider = ?settings.provider,
        model = provider.model_id(),
        dimensions = provider.dimensions(),
        "embedding provider ready"
    );
    Ok(provider)
}

/// Build the generation model named in the settings.
pub fn build_llm(settings: &GenerationSettings) -> Result<Arc<dyn Llm>> {
    let llm: Arc<dyn Llm> = match settings.provider {
        GenerationBackend::Echo => Arc::new(MockLlm::context()),
        GenerationBackend::Ollama => {
            let mut model = OllamaModel::new();
            if let Some(name) = &settings.model {
                model = model.with_model(name);
            }
            if let Some(base_url) = &settings.base_url {
                model = model.with_base_url(base_url);
            }
            if let Some(temperature) = settings.temperature {
                model = model.with_temperature(temperature);
            }
            Arc::new(model)
        }
        GenerationBackend::OpenAI => {
            let key = api_key(settings.api_key_env.as_deref(), OPENAI_KEY_VARS)?;
            let mut model = OpenAIChatModel::new(key)?;
            if let Some(name) = &settings.model {
                model = model.with_model(name);
            }
            if let Some(base_url) = &settings.base_url {
                model = model.with_base_url(base_url);
            }
            if let Some(temperature) = settings.temperature {
                model = model.with_temperature(temperature);
            }
            Arc::new(model)
        }
        GenerationBackend::Gemini => {
            let key = api_key(settings.api_key_env.as_deref(), GEMINI_KEY_VARS)?;
            let mut model = GeminiModel::new(key)?;
            if let Some(name) = &settings.model {
                model = model.with_model(name);
            }
            if let Some(base_url) = &settings.base_url {
                model = model.with_base_url(base_url);
            }
            if let Some(temperature) = settings.temperature {
                model = model.with_temperature(temperature);
            }
            Arc::new(model)
        }
    };

    info!(provider = ?settings.provider, model = llm.name(), "generation model ready");
    Ok(llm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_offline() {
        let embedder = build_embedder(&EmbeddingSettings::default()).unwrap();
        assert_eq!(embedder.model_id(), "lexical-hash-512");

        let llm = build_llm(&GenerationSettings::default()).unwrap();
        assert_eq!(llm.name(), "context-echo");
    }

    #[test]
    fn test_hash_dimensions_from_settings() {
        let settings = EmbeddingSettings { dimensions: Some(64), ..Default::default() };
        let embedder = build_embedder(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 64);
        assert_eq!(embedder.model_id(), "lexical-hash-64");
    }

    #[test]
    fn test_ollama_model_requires_dimensions() {
        let settings = EmbeddingSettings {
            provider: EmbeddingBackend::Ollama,
            model: Some("nomic-embed-text".to_string()),
            ..Default::default()
        };
        assert!(build_embedder(&settings).is_err());

        let settings = EmbeddingSettings { dimensions: Some(768), ..settings };
        let embedder = build_embedder(&settings).unwrap();
        assert_eq!(embedder.model_id(), "nomic-embed-text");
        assert_eq!(embedder.dimensions(), 768);
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let settings = GenerationSettings {
            provider: GenerationBackend::OpenAI,
            api_key_env: Some("RAGCHAT_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..Default::default()
        };
        let err = build_llm(&settings).err().unwrap();
        assert!(err.to_string().contains("RAGCHAT_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_gemini_reads_configured_key_variable() {
        let settings = EmbeddingSettings {
            provider: EmbeddingBackend::Gemini,
            api_key_env: Some("RAGCHAT_TEST_GEMINI_KEY_THAT_IS_NEVER_SET".to_string()),
            ..Default::default()
        };
        let err = build_embedder(&settings).err().unwrap();
        assert!(err.to_string().contains("RAGCHAT_TEST_GEMINI_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_api_key_falls_back_through_defaults() {
        let path = std::env::var("PATH").unwrap();
        let key = api_key(None, &["RAGCHAT_TEST_UNSET_VAR", "PATH"]).unwrap();
        assert_eq!(key, path);

        let err = api_key(None, &["RAGCHAT_TEST_UNSET_A", "RAGCHAT_TEST_UNSET_B"]).unwrap_err();
        assert!(err.to_string().contains("RAGCHAT_TEST_UNSET_A or RAGCHAT_TEST_UNSET_B"));
    }
}
