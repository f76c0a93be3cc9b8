//! SQLite vector store with brute-force cosine search
//!
//! One table holds chunk text, metadata and the embedding as a little-endian
//! `f32` blob. Search scans every row, which is fine for a single document.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, ScoredChunk};

/// Name of the single table backing the store
pub const TABLE_NAME: &str = "vector_store";

/// SQLite-backed vector store
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
    min_similarity: Option<f32>,
}

/// A stored row before scoring
struct StoredRow {
    chunk: Chunk,
    embedding: Vec<f32>,
    embedding_model: String,
}

impl SqliteVectorStore {
    /// Create or open the store at `path`; `":memory:"` opens a private in-memory database
    pub fn new<P: AsRef<Path>>(
        path: P,
        embedder: Arc<dyn EmbeddingProvider>,
        min_similarity: Option<f32>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| Error::store(format!("Failed to open {}: {}", path.display(), e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            min_similarity,
        };
        store.migrate()?;

        tracing::info!("Opened vector store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::new(":memory:", embedder, None)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vector_store (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                char_start INTEGER NOT NULL,
                char_end INTEGER NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                embedding_model TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| Error::store(format!("Failed to create {}: {}", TABLE_NAME, e)))
    }

    /// Run `f` on the connection from a blocking thread
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::store(format!(
            "Embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; zero when either vector has no magnitude
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::store(format!("Invalid id {}: {}", raw, e)))
}

fn insert_rows(conn: &mut Connection, rows: &[(Chunk, Vec<f32>)], model: &str) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO vector_store
             (id, document_id, chunk_index, char_start, char_end, content, metadata, embedding, embedding_model)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                document_id = excluded.document_id,
                chunk_index = excluded.chunk_index,
                char_start = excluded.char_start,
                char_end = excluded.char_end,
                content = excluded.content,
                metadata = excluded.metadata,
                embedding = excluded.embedding,
                embedding_model = excluded.embedding_model",
        )?;
        for (chunk, embedding) in rows {
            stmt.execute(params![
                chunk.id.to_string(),
                chunk.document_id.to_string(),
                chunk.chunk_index,
                chunk.char_start as i64,
                chunk.char_end as i64,
                chunk.content,
                serde_json::to_string(&chunk.metadata)?,
                encode_embedding(embedding),
                model,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

fn load_rows(conn: &Connection) -> Result<Vec<StoredRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, document_id, chunk_index, char_start, char_end, content, metadata, embedding, embedding_model
         FROM vector_store ORDER BY seq",
    )?;

    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Vec<u8>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(
            |(id, document_id, chunk_index, start, end, content, metadata, embedding, model)| {
                Ok(StoredRow {
                    chunk: Chunk {
                        id: parse_uuid(&id)?,
                        document_id: parse_uuid(&document_id)?,
                        content,
                        chunk_index,
                        char_start: start as usize,
                        char_end: end as usize,
                        metadata: serde_json::from_str(&metadata)?,
                    },
                    embedding: decode_embedding(&embedding)?,
                    embedding_model: model,
                })
            },
        )
        .collect()
}

/// Score `rows` against `query`, best first; ties keep storage order
fn rank(
    rows: Vec<StoredRow>,
    query: &[f32],
    model: &str,
    k: usize,
    min_similarity: Option<f32>,
) -> Result<Vec<ScoredChunk>> {
    let mut scored = Vec::with_capacity(rows.len());
    for row in rows {
        if row.embedding_model != model {
            return Err(Error::store(format!(
                "Chunk {} was embedded with {} but the query uses {}; clear the store and re-ingest",
                row.chunk.id, row.embedding_model, model
            )));
        }
        if row.embedding.len() != query.len() {
            return Err(Error::store(format!(
                "Chunk {} has {} dimensions but the query has {}",
                row.chunk.id,
                row.embedding.len(),
                query.len()
            )));
        }

        let similarity = cosine_similarity(query, &row.embedding);
        if min_similarity.map_or(true, |min| similarity >= min) {
            scored.push(ScoredChunk {
                chunk: row.chunk,
                similarity,
            });
        }
    }

    // Stable sort keeps insertion order among equal scores
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(k);
    Ok(scored)
}

#[async_trait]
impl VectorStoreProvider for SqliteVectorStore {
    async fn ingest(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let expected = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(Error::embedding(format!(
                "{} returned a {}-dimensional vector, expected {}",
                self.embedder.model(),
                bad.len(),
                expected
            )));
        }

        tracing::debug!(
            "Embedded {} chunks with {} ({})",
            chunks.len(),
            self.embedder.name(),
            self.embedder.model()
        );

        let rows: Vec<(Chunk, Vec<f32>)> = chunks.iter().cloned().zip(embeddings).collect();
        let model = self.embedder.model().to_string();
        let written = self.with_conn(move |conn| insert_rows(conn, &rows, &model)).await?;

        tracing::info!("Stored {} chunks in {}", written, TABLE_NAME);
        Ok(written)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.is_empty().await? {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let rows = self.with_conn(|conn| load_rows(conn)).await?;
        let results = rank(
            rows,
            &query_embedding,
            self.embedder.model(),
            k,
            self.min_similarity,
        )?;

        tracing::debug!("Search returned {} of top {} chunks", results.len(), k);
        Ok(results)
    }

    async fn clear(&self) -> Result<usize> {
        let removed = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM vector_store", [])?))
            .await?;
        tracing::info!("Cleared {} rows from {}", removed, TABLE_NAME);
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM vector_store", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let sqlite_ok = self
            .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))? == 1))
            .await?;
        Ok(sqlite_ok && self.embedder.health_check().await?)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
