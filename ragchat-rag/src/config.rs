//! Configuration for the RAG chat loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for chunking, retrieval, and capability timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum passage length in characters.
    pub max_length: usize,
    /// Number of characters shared between consecutive passages.
    pub overlap: usize,
    /// Number of passages retrieved for each user query.
    pub top_k: usize,
    /// Results scoring below this are dropped. `None` keeps everything.
    pub similarity_threshold: Option<f32>,
    /// Upper bound on a single embedding call.
    #[serde(with = "duration_secs")]
    pub embed_timeout: Duration,
    /// Upper bound on a single generation call.
    #[serde(with = "duration_secs")]
    pub generate_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_length: 512,
            overlap: 64,
            top_k: 4,
            similarity_threshold: None,
            embed_timeout: Duration::from_secs(30),
            generate_timeout: Duration::from_secs(120),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `max_length == 0`
    /// - `overlap >= max_length`
    /// - `top_k == 0`
    /// - either timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(RagError::ConfigError("max_length must be greater than zero".to_string()));
        }
        if self.overlap >= self.max_length {
            return Err(RagError::ConfigError(format!(
                "overlap ({}) must be less than max_length ({})",
                self.overlap, self.max_length
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.embed_timeout.is_zero() || self.generate_timeout.is_zero() {
            return Err(RagError::ConfigError("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum passage length in characters.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.config.max_length = max_length;
        self
    }

    /// Set the overlap between consecutive passages in characters.
    pub fn overlap(mut self, overlap: usize) -> Self {
        self.config.overlap = overlap;
        self
    }

    /// Set the number of passages retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score kept in retrieval results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the time allowed for one embedding call.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    /// Set the time allowed for one generation call.
    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = RagConfig::builder()
            .max_length(25)
            .overlap(0)
            .top_k(1)
            .similarity_threshold(0.2)
            .embed_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.max_length, 25);
        assert_eq!(config.overlap, 0);
        assert_eq!(config.top_k, 1);
        assert_eq!(config.similarity_threshold, Some(0.2));
        assert_eq!(config.embed_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_max_length() {
        let err = RagConfig::builder().max_length(10).overlap(10).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = RagConfig::builder().top_k(0).build().unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = RagConfig::builder().generate_timeout(Duration::ZERO).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn test_json_round_trip_uses_seconds() {
        let json = serde_json::to_value(RagConfig::default()).unwrap();
        assert_eq!(json["embed_timeout"], 30);
        let parsed: RagConfig =
            serde_json::from_value(serde_json::json!({ "top_k": 2, "generate_timeout": 9 }))
                .unwrap();
        assert_eq!(parsed.top_k, 2);
        assert_eq!(parsed.generate_timeout, Duration::from_secs(9));
        assert_eq!(parsed.max_length, 512);
    }
}
