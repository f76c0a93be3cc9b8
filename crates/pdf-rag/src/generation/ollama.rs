//! Ollama HTTP client for embeddings and chat

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::types::{Message, Prompt};

/// Ollama API client
///
/// Requests are sent once; failures are reported to the caller unchanged.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedResponse {
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatOptions {
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    pub content: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with `model`
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest { model, prompt: text };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "Embedding failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if embed_response.embedding.is_empty() {
            return Err(Error::embedding(format!("Model {} returned an empty embedding", model)));
        }

        Ok(embed_response.embedding)
    }

    /// Send a chat prompt to `model` and return the reply text
    pub async fn chat(&self, model: &str, temperature: f32, prompt: &Prompt) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages: &prompt.messages,
            stream: false,
            options: ChatOptions { temperature },
        };

        tracing::info!("Requesting chat completion from Ollama model {}", model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::chat(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::chat(format!("Chat failed: HTTP {} - {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::chat(format!("Failed to parse chat response: {}", e)))?;

        Ok(chat_response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let prompt = Prompt {
            messages: vec![Message::system("Use the DOCUMENTS."), Message::user("Who is Pope?")],
        };
        let request = ChatRequest {
            model: "llama3.2:3b",
            messages: &prompt.messages,
            stream: false,
            options: ChatOptions { temperature: 0.5 },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2:3b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Who is Pope?");
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{
            "model": "llama3.2:3b",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "An English poet."},
            "done": true
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.content, "An English poet.");
    }

    #[test]
    fn test_embed_payload_shapes() {
        let request = EmbedRequest {
            model: "nomic-embed-text",
            prompt: "heroic couplet",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "heroic couplet");

        let parsed: EmbedResponse = serde_json::from_str(r#"{"embedding":[0.25,-1.0]}"#).unwrap();
        assert_eq!(parsed.embedding, vec![0.25, -1.0]);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new(&OllamaConfig {
            base_url: "http://localhost:11434/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
