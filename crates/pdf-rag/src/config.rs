//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generation::prompt::{DEFAULT_SYSTEM_TEMPLATE, DOCUMENTS_PLACEHOLDER};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// PDF source and page formatting
    pub pdf: PdfReaderConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chat model configuration
    pub chat: ChatConfig,
    /// Ollama server settings
    pub ollama: OllamaConfig,
    /// OpenAI-compatible API settings
    pub openai: OpenAiConfig,
    /// Vector store configuration
    pub store: StoreConfig,
    /// Prompt template and sample question
    pub prompt: PromptConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    ///
    /// Sections and fields missing from the file keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pdf.path.as_os_str().is_empty() {
            return Err(Error::config("pdf.path must be set"));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.chunking.max_num_chunks == 0 {
            return Err(Error::config("chunking.max_num_chunks must be greater than 0"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than 0"));
        }
        if !self.prompt.system_template.contains(DOCUMENTS_PLACEHOLDER) {
            return Err(Error::config(format!(
                "prompt.system_template must contain {}",
                DOCUMENTS_PLACEHOLDER
            )));
        }

        let needs_openai = self.embeddings.provider == EmbeddingBackend::OpenAi
            || self.chat.provider == ChatBackend::OpenAi;
        if needs_openai && self.openai.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::config(
                "openai.api_key (or OPENAI_API_KEY) is required for the openai provider",
            ));
        }

        Ok(())
    }
}

/// PDF reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfReaderConfig {
    /// Path of the PDF to ingest
    pub path: PathBuf,
    /// Source pages joined into one document (0 = whole file)
    pub pages_per_document: usize,
    /// Leading pages left untouched by line deletion
    pub top_pages_to_skip_before_delete: usize,
    /// Lines removed from the top of each page
    pub top_lines_to_delete: usize,
    /// Lines removed from the bottom of each page (footers)
    pub bottom_lines_to_delete: usize,
    /// Strip leading whitespace from every line
    pub left_align: bool,
}

impl Default for PdfReaderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            pages_per_document: 1,
            top_pages_to_skip_before_delete: 0,
            top_lines_to_delete: 0,
            bottom_lines_to_delete: 0,
            left_align: false,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token budget per chunk
    pub chunk_size: usize,
    /// A sentence break is only used as a cut point past this many bytes
    pub min_chunk_size_chars: usize,
    /// Upper bound on chunks produced from one document
    pub max_num_chunks: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            min_chunk_size_chars: 350,
            max_num_chunks: 10_000,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the prompt
    pub top_k: usize,
    /// Drop matches below this cosine similarity
    pub min_similarity: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_similarity: None,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible embeddings endpoint
    OpenAi,
    /// Offline feature-hashing embedder
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which backend computes embeddings
    pub provider: EmbeddingBackend,
    /// Model name (ignored by the hashing backend)
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// Chat backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions endpoint
    OpenAi,
}

/// Chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Which backend answers questions
    pub provider: ChatBackend,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatBackend::Ollama,
            model: "llama3.2:3b".to_string(),
            temperature: 0.7,
        }
    }
}

/// Ollama server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

/// OpenAI-compatible API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL including the version segment
    pub base_url: String,
    /// Bearer token, normally supplied through OPENAI_API_KEY
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file (":memory:" for a throwaway store)
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pdf-rag.db"),
        }
    }
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System message template; must contain `{documents}`
    pub system_template: String,
    /// Question asked by `run`
    pub question: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
            question: "Who is Alexander Pope".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_settings() {
        let config = RagConfig::default();
        assert_eq!(config.pdf.pages_per_document, 1);
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.retrieval.top_k, 4);
        assert!(config.prompt.system_template.contains(DOCUMENTS_PLACEHOLDER));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml(
            r#"
            [pdf]
            path = "docs/pope.pdf"
            bottom_lines_to_delete = 3
            top_pages_to_skip_before_delete = 1

            [embeddings]
            provider = "hashing"
            dimensions = 256
            "#,
        )
        .unwrap();

        assert_eq!(config.pdf.path, PathBuf::from("docs/pope.pdf"));
        assert_eq!(config.pdf.bottom_lines_to_delete, 3);
        assert_eq!(config.pdf.pages_per_document, 1);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Hashing);
        assert_eq!(config.embeddings.dimensions, 256);
        assert_eq!(config.chunking.chunk_size, 800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses_with_demo_reader_settings() {
        let config = RagConfig::from_toml(include_str!("../pdf-rag.example.toml")).unwrap();

        assert_eq!(config.pdf.top_pages_to_skip_before_delete, 1);
        assert_eq!(config.pdf.bottom_lines_to_delete, 3);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.prompt.question, "Who is Alexander Pope");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RagConfig::from_toml("[retrieval]\ntop_k = \"four\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = RagConfig::default();
        assert!(config.validate().is_err(), "empty pdf path");

        config.pdf.path = PathBuf::from("a.pdf");
        assert!(config.validate().is_ok());

        config.chunking.max_num_chunks = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.chunking.max_num_chunks = 10_000;

        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
        config.retrieval.top_k = 4;

        config.prompt.system_template = "no placeholder".to_string();
        assert!(config.validate().is_err());
        config.prompt.system_template = DEFAULT_SYSTEM_TEMPLATE.to_string();

        config.chat.provider = ChatBackend::OpenAi;
        assert!(config.validate().is_err(), "missing api key");
        config.openai.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = RagConfig::default();
        config.openai.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }
}
