//! Prompt assembly for retrieval-grounded answers

use crate::error::{Error, Result};
use crate::types::{Message, Prompt, ScoredChunk};

/// Placeholder replaced by the retrieved chunk texts
pub const DOCUMENTS_PLACEHOLDER: &str = "{documents}";

/// Default system instruction
pub const DEFAULT_SYSTEM_TEMPLATE: &str = r#"You are answering questions about the document the user has loaded.

Use the information in the DOCUMENTS section to give accurate answers, and answer as if you already knew it.
If the DOCUMENTS section does not contain the answer, say that you don't know.

DOCUMENTS:
{documents}
"#;

/// Builds the `[system, user]` message pair for a query
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    /// Create a builder; the template must contain `{documents}`
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(DOCUMENTS_PLACEHOLDER) {
            return Err(Error::config(format!(
                "System template has no {} placeholder",
                DOCUMENTS_PLACEHOLDER
            )));
        }
        Ok(Self { template })
    }

    /// The raw template
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Join retrieved chunk texts, unmodified, in ranked order
    pub fn build_context(retrieved: &[ScoredChunk]) -> String {
        retrieved
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Assemble the prompt for `query`
    ///
    /// The user message is the query verbatim; only the system message is
    /// templated.
    pub fn build(&self, retrieved: &[ScoredChunk], query: &str) -> Prompt {
        let system = self
            .template
            .replace(DOCUMENTS_PLACEHOLDER, &Self::build_context(retrieved));

        Prompt {
            messages: vec![Message::system(system), Message::user(query)],
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
        }
    }
}
