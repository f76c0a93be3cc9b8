//! Answer generation: prompt assembly and the Ollama client

pub mod ollama;
pub mod prompt;

pub use ollama::OllamaClient;
pub use prompt::{PromptBuilder, DEFAULT_SYSTEM_TEMPLATE, DOCUMENTS_PLACEHOLDER};
