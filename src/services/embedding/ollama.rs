//! Ollama Embedding Adapter
//!
//! `EmbeddingProvider` implementation backed by a local Ollama server's
//! `/api/embeddings` endpoint. Requests carry a hard timeout so a stalled
//! server degrades into an upstream error instead of hanging a retrieval.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::utils::error::{EngineError, EngineResult};

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Default embedding model (768 dimensions)
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_DIMENSION: usize = 768;

/// Request timeout for embedding calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Ollama-backed embedding provider.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    /// Create an embedder against the default local endpoint and model.
    pub fn new() -> Self {
        Self::with_config(OLLAMA_DEFAULT_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_DIMENSION)
    }

    /// Create an embedder for a specific endpoint, model and dimension.
    pub fn with_config(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
        }
    }
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::embedding(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::embedding(format!(
                "HTTP {} from embedding server: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngineError::embedding(format!("unparseable embedding response: {}", e)))?;

        if parsed.embedding.is_empty() {
            return Err(EngineError::embedding(
                "embedding server returned an empty vector".to_string(),
            ));
        }

        if parsed.embedding.len() != self.dimension {
            // A changed model dimension corrupts similarity semantics against
            // everything already stored; surface loudly.
            return Err(EngineError::config(format!(
                "embedding dimension changed: expected {}, model '{}' returned {}",
                self.dimension,
                self.model,
                parsed.embedding.len()
            )));
        }

        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> EngineResult<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::embedding(format!("Ollama unreachable at {}: {}", url, e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::embedding(format!(
                "Ollama health check failed: HTTP {}",
                response.status()
            )))
        }
    }
}
