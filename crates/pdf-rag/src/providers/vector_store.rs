//! Vector store provider trait for storing and searching chunks

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, ScoredChunk};

/// Trait for chunk storage and similarity search
///
/// The store owns its embedding provider, so chunks and queries are always
/// embedded by the same model.
///
/// Implementations:
/// - `SqliteVectorStore`: single SQLite table, brute-force cosine search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Embed and persist `chunks`; returns rows written
    async fn ingest(&self, chunks: &[Chunk]) -> Result<usize>;

    /// The `k` stored chunks most similar to `query`, best first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Remove every stored chunk; returns rows removed
    async fn clear(&self) -> Result<usize>;

    /// Number of stored chunks
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the store and its embedder are usable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
