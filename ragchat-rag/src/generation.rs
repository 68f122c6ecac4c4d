//! Grounded answer generation.
//!
//! [`build_prompt`] assembles the single prompt sent to the model and
//! [`Generator`] sends it, bounded by a timeout.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::document::Passage;
use crate::error::{RagError, Result};
use crate::llm::Llm;

/// Instruction placed at the top of every prompt.
pub const INSTRUCTION: &str = "You are a helpful assistant. Answer the question using only the \
context below. If the context does not contain the answer, say that you do not know.";

/// Separator between consecutive context passages.
pub const PASSAGE_DELIMITER: &str = "\n\n---\n\n";

/// Context block used when retrieval found nothing.
pub const NO_CONTEXT: &str = "(no relevant context found)";

/// Build the prompt for `query` grounded on `passages` (most relevant first).
pub fn build_prompt(query: &str, passages: &[Passage]) -> String {
    let context = if passages.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        passages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join(PASSAGE_DELIMITER)
    };
    format!("{INSTRUCTION}\n\nContext:\n{context}\n\nQuestion: {query}")
}

/// Sends grounded prompts to an [`Llm`].
pub struct Generator {
    llm: Arc<dyn Llm>,
    timeout: Duration,
}

impl Generator {
    /// Wrap `llm`, giving each call at most `timeout` to answer.
    pub fn new(llm: Arc<dyn Llm>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Name of the underlying model.
    pub fn model(&self) -> &str {
        self.llm.name()
    }

    /// Generate a response to `query` using `passages` as context.
    ///
    /// The model's text is returned unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationFailure`] if the model fails, or does
    /// not answer within the configured timeout.
    pub async fn generate(&self, query: &str, passages: &[Passage]) -> Result<String> {
        let prompt = build_prompt(query, passages);
        debug!(
            model = self.llm.name(),
            context = passages.len(),
            prompt_len = prompt.len(),
            "generating"
        );

        match tokio::time::timeout(self.timeout, self.llm.complete(&prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                error!(model = self.llm.name(), error = %e, "generation failed");
                Err(match e {
                    failure @ RagError::GenerationFailure { .. } => failure,
                    other => RagError::generation(self.llm.name(), other.to_string()),
                })
            }
            Err(_) => {
                error!(model = self.llm.name(), timeout = ?self.timeout, "generation timed out");
                Err(RagError::generation(
                    self.llm.name(),
                    format!("no response within {:?}", self.timeout),
                ))
            }
        }
    }
}
