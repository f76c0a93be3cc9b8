//! Chat prompt and answer types

use serde::{Deserialize, Serialize};

use super::ScoredChunk;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Ordered messages sent to the chat model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<Message>,
}

impl Prompt {
    /// Content of the first message with the given role
    pub fn first(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }

    /// System instruction, if present
    pub fn system_message(&self) -> Option<&str> {
        self.first(Role::System)
    }

    /// User message, if present
    pub fn user_message(&self) -> Option<&str> {
        self.first(Role::User)
    }
}

/// Answer to one query
#[derive(Debug, Clone)]
pub struct Answer {
    /// Chat completion text, unmodified
    pub text: String,
    /// Chunks the answer was conditioned on, in ranked order
    pub sources: Vec<ScoredChunk>,
}
