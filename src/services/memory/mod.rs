//! Per-User Memory System
//!
//! Long-lived conversational memory: relevance scoring, contextual
//! re-ranking, conflict resolution, temporal decay, consolidation and
//! lifecycle policy.
//!
//! ## Module Structure
//!
//! - `store` — typed facade over the external vector store
//! - `decay` — per-type exponential time decay and access boosts
//! - `classify` — pluggable type/importance heuristics
//! - `conflict` — conflict detection and ADD/UPDATE/DELETE resolution
//! - `retrieval` — multi-factor relevance scoring
//! - `contextual` — conversation-aware re-ranking and diversity selection
//! - `extraction` — turn-to-candidate pipeline through the resolver
//! - `maintenance` — lifecycle batch job and health metrics
//! - `manager` — the caller-facing `MemoryEngine`

pub mod classify;
pub mod conflict;
pub mod contextual;
pub mod decay;
pub mod extraction;
pub mod maintenance;
pub mod manager;
pub mod retrieval;
pub mod store;

pub use classify::{KeywordIntelligence, MemoryIntelligence};
pub use conflict::{ConflictKind, ConflictResolver, MemoryOperation, SkipReason};
pub use contextual::ContextualRanker;
pub use decay::{access_bonus, access_boost, decay_strength, half_life_days};
pub use extraction::{ExtractionOutput, ExtractionPipeline};
pub use maintenance::MemoryMaintenance;
pub use manager::MemoryEngine;
pub use retrieval::{compute_relevance_score, RetrievalRequest};
pub use store::MemoryStore;
