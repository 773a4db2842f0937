//! Completion Collaborator Boundary
//!
//! Async trait for the external natural-language completion service used by
//! the extraction pipeline and consolidation summarizer, plus the JSON
//! parsing helper shared by structured-output callers.
//!
//! ## Module Structure
//!
//! - `ollama` — adapter for a local Ollama server

pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::EngineResult;

pub use ollama::OllamaCompletion;

/// Per-request generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 300,
            top_p: 0.9,
        }
    }
}

/// External completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a plain-text completion.
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> EngineResult<String>;

    /// Generate a completion expected to be a JSON object.
    ///
    /// Returns `Ok(None)` when the model produced output that cannot be
    /// parsed as JSON — malformed output never raises past this boundary.
    /// `Err` is reserved for transport-level failures.
    async fn complete_structured(&self, prompt: &str) -> EngineResult<Option<serde_json::Value>>;
}

/// Extract a JSON value from model output, tolerating markdown code fences.
pub fn parse_json_block(response: &str) -> Option<serde_json::Value> {
    let trimmed = response.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let inner = inner.strip_suffix("```").unwrap_or(inner).trim();

    serde_json::from_str(inner).ok()
}
