//! Storage module for persistent vector storage
//!
//! Provides a SQLite-backed implementation of `VectorStoreProvider`.

mod sqlite_store;

pub use sqlite_store::{SqliteVectorStore, TABLE_NAME};
