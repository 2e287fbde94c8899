mod ollama;

pub use ollama::OllamaClient;

use crate::error::RagError;

/// Trait for a text-completion backend
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a fully rendered prompt and return the model's answer
    async fn complete(&self, prompt: &str) -> Result<String, RagError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}
