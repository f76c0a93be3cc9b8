//! Core types for the RAG pipeline

pub mod document;
pub mod prompt;

pub use document::{Chunk, Document};
pub use prompt::{Answer, Message, Prompt, Role};

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more similar)
    pub similarity: f32,
}
