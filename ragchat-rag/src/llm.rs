//! Text-generation capability trait.

use async_trait::async_trait;

use crate::error::Result;

/// A model that turns a prompt into text.
///
/// One prompt in, one string out.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Model name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// Implementations report every failure as
    /// [`RagError::GenerationFailure`](crate::RagError::GenerationFailure).
    async fn complete(&self, prompt: &str) -> Result<String>;
}
