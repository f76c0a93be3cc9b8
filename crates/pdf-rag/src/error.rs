//! Error types for the RAG pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Nothing in the crate recovers from these locally; every variant aborts the
/// current run and surfaces at the process boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// PDF missing, unreadable or not extractable
    #[error("Failed to load '{path}': {message}")]
    Load { path: String, message: String },

    /// Malformed document content or splitter settings
    #[error("Failed to split document: {0}")]
    Split(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    Store(String),

    /// Chat completion error
    #[error("Chat completion failed: {0}")]
    Chat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite error
    #[error("Vector store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a load error
    pub fn load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a split error
    pub fn split(message: impl Into<String>) -> Self {
        Self::Split(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a chat error
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for errors raised by the vector store boundary
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Sqlite(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_message() {
        let err = Error::load("missing.pdf", "No such file");
        assert_eq!(err.to_string(), "Failed to load 'missing.pdf': No such file");
    }

    #[test]
    fn test_sqlite_errors_count_as_store_errors() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(err.is_store_error());
        assert!(Error::store("locked").is_store_error());
        assert!(!Error::chat("quota").is_store_error());
    }
}
