//! Mock model for tests and offline use.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::llm::Llm;

#[derive(Debug, Clone)]
enum Behaviour {
    Fixed(String),
    Context,
    Fail(String),
}

/// An [`Llm`] that never leaves the process.
///
/// - [`MockLlm::fixed`] always answers with the same text.
/// - [`MockLlm::context`] answers with the context block of the prompt, so
///   the reply is whatever retrieval found.
/// - [`MockLlm::failing`] always returns a generation failure.
///
/// Every prompt received is recorded and available from [`MockLlm::prompts`].
#[derive(Debug)]
pub struct MockLlm {
    name: String,
    behaviour: Behaviour,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn with(name: &str, behaviour: Behaviour) -> Self {
        Self { name: name.to_string(), behaviour, prompts: Mutex::new(Vec::new()) }
    }

    /// Always reply with `reply`.
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self::with("mock", Behaviour::Fixed(reply.into()))
    }

    /// Reply with the context block of the prompt, or the no-context
    /// marker when nothing was retrieved.
    pub fn context() -> Self {
        Self::with("context-echo", Behaviour::Context)
    }

    /// Fail every call with a generation error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with("mock", Behaviour::Fail(message.into()))
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

/// The text between `Context:` and `Question:` in a prompt built by
/// [`build_prompt`](crate::generation::build_prompt).
fn context_block(prompt: &str) -> &str {
    let after = prompt.split_once("Context:\n").map(|(_, rest)| rest).unwrap_or(prompt);
    after.rsplit_once("\n\nQuestion:").map(|(context, _)| context).unwrap_or(after).trim()
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.behaviour {
            Behaviour::Fixed(reply) => Ok(reply.clone()),
            Behaviour::Context => Ok(context_block(prompt).to_string()),
            Behaviour::Fail(message) => Err(RagError::generation(&self.name, message.clone())),
        }
    }
}
