//! Services
//!
//! Business logic for the engine: the memory system itself plus the
//! collaborator boundaries it depends on.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod store;

pub use embedding::EmbeddingProvider;
pub use llm::{CompletionOptions, CompletionProvider};
pub use memory::MemoryEngine;
pub use store::{InMemoryVectorStore, VectorStore};
