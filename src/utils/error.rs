//! Error Handling
//!
//! Unified error types for the engine.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Vector store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Embedding collaborator errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Completion collaborator errors
    #[error("Completion error: {0}")]
    Completion(String),

    /// Configuration errors (includes embedding-dimension mismatches)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine errors
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a completion error
    pub fn completion(msg: impl Into<String>) -> Self {
        Self::Completion(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from an external collaborator and the caller
    /// should expect a documented fallback rather than a retry.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Completion(_))
    }
}
