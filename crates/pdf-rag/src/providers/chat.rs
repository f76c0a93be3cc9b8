//! Chat client trait for answer generation

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Prompt;

/// Trait for chat-completion backends
///
/// Implementations:
/// - `OllamaChat`: local Ollama server
/// - `OpenAiChat`: OpenAI-compatible `/chat/completions`
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `prompt` and return the completion text unmodified
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model answering the prompt
    fn model(&self) -> &str;
}
