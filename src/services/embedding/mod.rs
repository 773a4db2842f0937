//! Embedding Collaborator Boundary
//!
//! Async trait for the external text-embedding service. Implementations must
//! produce vectors of a fixed, known dimensionality; the engine treats a
//! dimension change against an existing store as a fatal configuration error
//! requiring store migration, never a silent degradation.

pub mod ollama;

use async_trait::async_trait;

use crate::utils::error::EngineResult;

pub use ollama::OllamaEmbedder;

/// External embedding service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a dense vector of `self.dimension()` length.
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Fixed dimensionality of the produced vectors.
    fn dimension(&self) -> usize;

    /// Check that the provider is reachable. Local/stub providers succeed
    /// trivially.
    async fn health_check(&self) -> EngineResult<()> {
        Ok(())
    }
}
