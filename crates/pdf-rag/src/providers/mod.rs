//! Provider abstractions for embeddings, chat and vector storage
//!
//! The pipeline only talks to these traits, so backends are swapped through
//! configuration.

pub mod chat;
pub mod embedding;
pub mod hashing;
pub mod ollama;
pub mod openai;
pub mod vector_store;

pub use chat::ChatClient;
pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use ollama::{OllamaChat, OllamaEmbedder};
pub use openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
pub use vector_store::VectorStoreProvider;
