//! Memoir Engine - Conversational Memory Library
//!
//! This library augments a conversational agent with long-lived, per-user
//! memory. It decides what to remember, how important it is, how fast it
//! fades, which stored items are relevant to a new query, and how to
//! reconcile new information with what is already known:
//! - Multi-factor relevance scoring and contextual re-ranking
//! - Heuristic classification and importance estimation
//! - Conflict detection/resolution between new and existing memories
//! - Temporal decay, clustering-based consolidation, expiration policy
//!
//! Persistence, embeddings and completions are external collaborators
//! reached through the `VectorStore`, `EmbeddingProvider` and
//! `CompletionProvider` traits.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export the caller-facing surface
pub use config::EngineConfig;
pub use models::context::ConversationContext;
pub use models::memory::{CandidateMemory, MemoryRecord, MemoryType, SourceType};
pub use models::report::{
    CommitOutcome, ExtractionReport, HealthReport, HealthStatus, MaintenanceReport,
    RetrievalInsights, ScoredMemory,
};
pub use services::embedding::{EmbeddingProvider, OllamaEmbedder};
pub use services::llm::{CompletionOptions, CompletionProvider, OllamaCompletion};
pub use services::memory::MemoryEngine;
pub use services::store::{InMemoryVectorStore, VectorStore};
pub use utils::error::{EngineError, EngineResult};
