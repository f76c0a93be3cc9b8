//! Retrieve-then-generate orchestration
//!
//! `RagPipeline` owns one instance of every component and drives them through
//! a fixed sequence: clear the store, ingest the PDF, answer a question.

use std::fmt;
use std::sync::Arc;

use crate::config::{ChatBackend, EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};
use crate::generation::{OllamaClient, PromptBuilder};
use crate::ingestion::{PdfPageReader, TokenTextSplitter};
use crate::providers::{
    ChatClient, EmbeddingProvider, HashingEmbedder, OllamaChat, OllamaEmbedder, OpenAiChat,
    OpenAiClient, OpenAiEmbedder, VectorStoreProvider,
};
use crate::storage::SqliteVectorStore;
use crate::types::Answer;

/// Stage of a `run`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    ClearStore,
    Ingest,
    Answer,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::ClearStore => "clear-store",
            Self::Ingest => "ingest",
            Self::Answer => "answer",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Single-document RAG pipeline
pub struct RagPipeline {
    reader: PdfPageReader,
    splitter: TokenTextSplitter,
    store: Arc<dyn VectorStoreProvider>,
    chat: Arc<dyn ChatClient>,
    prompt_builder: PromptBuilder,
    top_k: usize,
    stage: PipelineStage,
}

impl RagPipeline {
    /// Assemble a pipeline from explicit components
    pub fn new(
        reader: PdfPageReader,
        splitter: TokenTextSplitter,
        store: Arc<dyn VectorStoreProvider>,
        chat: Arc<dyn ChatClient>,
        prompt_builder: PromptBuilder,
        top_k: usize,
    ) -> Self {
        Self {
            reader,
            splitter,
            store,
            chat,
            prompt_builder,
            top_k,
            stage: PipelineStage::Init,
        }
    }

    /// Wire the configured providers
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let needs_ollama = config.embeddings.provider == EmbeddingBackend::Ollama
            || config.chat.provider == ChatBackend::Ollama;
        let needs_openai = config.embeddings.provider == EmbeddingBackend::OpenAi
            || config.chat.provider == ChatBackend::OpenAi;

        let ollama = if needs_ollama {
            tracing::info!("Ollama client initialized ({})", config.ollama.base_url);
            Some(Arc::new(OllamaClient::new(&config.ollama)?))
        } else {
            None
        };
        let openai = if needs_openai {
            tracing::info!("OpenAI client initialized ({})", config.openai.base_url);
            Some(Arc::new(OpenAiClient::new(&config.openai)?))
        } else {
            None
        };

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::from_client(
                require(&ollama, "ollama")?,
                &config.embeddings,
            )),
            EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedder::from_client(
                require(&openai, "openai")?,
                &config.embeddings,
            )),
            EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.embeddings.dimensions)?),
        };

        let chat: Arc<dyn ChatClient> = match config.chat.provider {
            ChatBackend::Ollama => Arc::new(OllamaChat::from_client(
                require(&ollama, "ollama")?,
                &config.chat,
            )),
            ChatBackend::OpenAi => Arc::new(OpenAiChat::from_client(
                require(&openai, "openai")?,
                &config.chat,
            )),
        };

        tracing::info!(
            "Using {} embeddings ({}) and {} chat ({})",
            embedder.name(),
            embedder.model(),
            chat.name(),
            chat.model()
        );

        let store = Arc::new(SqliteVectorStore::new(
            &config.store.path,
            embedder,
            config.retrieval.min_similarity,
        )?);

        Ok(Self::new(
            PdfPageReader::new(&config.pdf),
            TokenTextSplitter::new(&config.chunking),
            store,
            chat,
            PromptBuilder::new(config.prompt.system_template.clone())?,
            config.retrieval.top_k,
        ))
    }

    /// Current stage
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// The vector store in use
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    /// Probe the store (with its embedder) and the chat backend
    ///
    /// Unreachable backends are logged and reported as `false`; they do not
    /// stop a later `run` from trying.
    pub async fn health_check(&self) -> Result<bool> {
        let store_ok = self.store.health_check().await?;
        if !store_ok {
            tracing::warn!("{} store or its embedder is not available", self.store.name());
        }
        let chat_ok = self.chat.health_check().await?;
        if !chat_ok {
            tracing::warn!("{} chat model {} is not available", self.chat.name(), self.chat.model());
        }
        Ok(store_ok && chat_ok)
    }

    /// Load, split and store the configured PDF; returns chunks stored
    pub async fn ingest_document(&self) -> Result<usize> {
        let documents = self.reader.load()?;
        let chunks = self.splitter.split(&documents)?;
        let stored = self.store.ingest(&chunks).await?;

        tracing::info!(
            "Ingested {}: {} documents, {} chunks",
            self.reader.path().display(),
            documents.len(),
            stored
        );
        Ok(stored)
    }

    /// Answer `query` from the stored chunks
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let retrieved = self.store.search(query, self.top_k).await?;

        for (rank, hit) in retrieved.iter().enumerate() {
            tracing::debug!(
                "#{} {} (similarity {:.3})",
                rank + 1,
                hit.chunk.source_label(),
                hit.similarity
            );
        }
        if retrieved.is_empty() {
            tracing::warn!("No chunks retrieved for query; asking without context");
        }

        let prompt = self.prompt_builder.build(&retrieved, query);
        let text = self.chat.complete(&prompt).await?;

        Ok(Answer {
            text,
            sources: retrieved,
        })
    }

    /// Clear the store, ingest the PDF and answer `question`
    ///
    /// Any failure aborts the run; earlier stages are not rolled back.
    pub async fn run(&mut self, question: &str) -> Result<Answer> {
        self.stage = PipelineStage::Init;

        self.advance(PipelineStage::ClearStore);
        self.store.clear().await?;

        self.advance(PipelineStage::Ingest);
        self.ingest_document().await?;

        self.advance(PipelineStage::Answer);
        let answer = self.answer(question).await?;

        self.advance(PipelineStage::Done);
        Ok(answer)
    }

    fn advance(&mut self, next: PipelineStage) {
        tracing::info!("Pipeline stage {} -> {}", self.stage, next);
        self.stage = next;
    }
}

fn require<T>(client: &Option<Arc<T>>, name: &str) -> Result<Arc<T>> {
    client
        .clone()
        .ok_or_else(|| Error::internal(format!("{} client was not initialized", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, PdfReaderConfig};
    use crate::ingestion::pdf_reader::tests::build_pdf;
    use crate::types::{Prompt, Role};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;

    /// Chat client that records prompts and replies with a fixed text
    struct RecordingChat {
        reply: String,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl RecordingChat {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            self.prompts.lock().push(prompt.clone());
            Ok(self.reply.clone())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatClient for FailingChat {
        async fn complete(&self, _prompt: &Prompt) -> Result<String> {
            Err(Error::chat("connection refused"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "none"
        }
    }

    fn pipeline(pdf: &Path, chat: Arc<dyn ChatClient>) -> RagPipeline {
        let reader = PdfPageReader::new(&PdfReaderConfig {
            path: pdf.to_path_buf(),
            ..Default::default()
        });
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(256).unwrap());
        let store = Arc::new(SqliteVectorStore::in_memory(embedder).unwrap());

        RagPipeline::new(
            reader,
            TokenTextSplitter::new(&ChunkingConfig::default()),
            store,
            chat,
            PromptBuilder::default(),
            4,
        )
    }

    fn write_pope_pdf(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("pope.pdf");
        let pdf = build_pdf(&[
            vec!["Alexander Pope was born in 1688."],
            vec!["Tomatoes grow best in full sun."],
        ]);
        std::fs::write(&path, pdf).unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_answers_from_retrieved_context() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pope_pdf(dir.path());
        let chat = RecordingChat::new("An English poet.");
        let mut pipeline = pipeline(&pdf, chat.clone());

        let question = "When was Alexander Pope born?";
        let answer = pipeline.run(question).await.unwrap();

        assert_eq!(answer.text, "An English poet.");
        assert_eq!(pipeline.stage(), PipelineStage::Done);
        assert!(answer.sources[0].chunk.content.contains("Alexander Pope was born in 1688."));

        let prompts = chat.prompts.lock();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        assert_eq!(prompt.messages[0].role, Role::System);
        assert!(prompt
            .system_message()
            .unwrap()
            .contains("Alexander Pope was born in 1688."));
        assert_eq!(prompt.user_message(), Some(question));
    }

    #[tokio::test]
    async fn test_run_clears_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pope_pdf(dir.path());
        let mut pipeline = pipeline(&pdf, RecordingChat::new("ok"));

        pipeline.run("Who is Alexander Pope").await.unwrap();
        let after_first = pipeline.store().len().await.unwrap();
        pipeline.run("Who is Alexander Pope").await.unwrap();

        assert_eq!(after_first, 2);
        assert_eq!(pipeline.store().len().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_answer_without_ingest_sends_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        let chat = RecordingChat::new("I don't know.");
        let pipeline = pipeline(&dir.path().join("unused.pdf"), chat.clone());

        let answer = pipeline.answer("Who is Alexander Pope").await.unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.text, "I don't know.");
        assert_eq!(chat.prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_pdf_aborts_at_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let chat = RecordingChat::new("unused");
        let mut pipeline = pipeline(&dir.path().join("missing.pdf"), chat.clone());

        let err = pipeline.run("Who is Alexander Pope").await.unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert_eq!(pipeline.stage(), PipelineStage::Ingest);
        assert!(chat.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_chat_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pope_pdf(dir.path());
        let mut pipeline = pipeline(&pdf, Arc::new(FailingChat));

        let err = pipeline.run("Who is Alexander Pope").await.unwrap_err();
        assert!(matches!(err, Error::Chat(_)));
        assert_eq!(pipeline.stage(), PipelineStage::Answer);
        // Ingested chunks stay in place
        assert_eq!(pipeline.store().len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_health_check_reports_chat_backend() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("unused.pdf");

        assert!(pipeline(&pdf, RecordingChat::new("ok")).health_check().await.unwrap());
        assert!(!pipeline(&pdf, Arc::new(FailingChat)).health_check().await.unwrap());
    }

    #[test]
    fn test_from_config_with_hashing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.pdf.path = dir.path().join("pope.pdf");
        config.store.path = dir.path().join("store.db");
        config.embeddings.provider = EmbeddingBackend::Hashing;
        config.embeddings.dimensions = 64;

        let pipeline = RagPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::Init);
        assert_eq!(pipeline.top_k, 4);
        assert_eq!(pipeline.chat.name(), "ollama");
    }

    #[test]
    fn test_from_config_rejects_invalid_settings() {
        let config = RagConfig::default();
        assert!(matches!(RagPipeline::from_config(&config), Err(Error::Config(_))));
    }
}
