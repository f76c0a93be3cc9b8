//! pdf-rag: single-document retrieval-augmented generation
//!
//! Loads one PDF page by page, splits the pages into token-bounded chunks,
//! stores embedded chunks in a SQLite-backed vector table and answers
//! questions by retrieving the most similar chunks and handing them, together
//! with the question, to a chat model.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{PipelineStage, RagPipeline};
pub use types::{
    document::{Chunk, Document},
    prompt::{Answer, Message, Prompt, Role},
    ScoredChunk,
};
