//! Reports
//!
//! Serializable result types returned by the engine's public entry points:
//! scored retrieval results, extraction commit reports, maintenance summaries
//! and health metrics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::memory::MemoryRecord;

// ============================================================================
// Retrieval
// ============================================================================

/// Per-factor breakdown of a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub semantic: f32,
    pub recency: f32,
    pub access_bonus: f32,
    pub type_weight: f32,
    pub confidence: f32,
    pub importance: f32,
    pub final_score: f32,
}

/// A retrieved record with its relevance score and, after contextual
/// re-ranking, the contextual and blended scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub relevance: f32,
    pub breakdown: ScoreBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contextual_relevance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blended_score: Option<f32>,
}

impl ScoredMemory {
    /// Score used for ordering: the blended score when contextual ranking
    /// ran, the base relevance otherwise.
    pub fn effective_score(&self) -> f32 {
        self.blended_score.unwrap_or(self.relevance)
    }
}

/// Summary of a retrieval pass, for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalInsights {
    pub total_candidates: usize,
    pub selected_count: usize,
    /// Distinct types / selected count; 0.0 for an empty selection.
    pub type_diversity: f32,
    pub avg_relevance: f32,
    pub avg_importance: f32,
    pub type_distribution: HashMap<String, usize>,
    pub top_entities: Vec<(String, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_coherence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_shift: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_topic: Option<String>,
}

// ============================================================================
// Extraction
// ============================================================================

/// What happened to one candidate memory during a commit pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Stored as a new record.
    Added { id: String, content: String },
    /// An existing record was rewritten with the candidate's content.
    Updated {
        id: String,
        content: String,
        reason: String,
    },
    /// An existing record was deleted and the candidate stored in its place.
    Superseded {
        deleted_id: String,
        new_id: String,
        content: String,
    },
    /// Dropped with an attributable reason; nothing was written.
    Skipped { content: String, reason: String },
    /// A write was attempted but a collaborator failed; nothing was written.
    Failed { content: String, reason: String },
}

/// Report for one processed conversation turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub outcomes: Vec<CommitOutcome>,
    pub facts_extracted: usize,
    pub preferences_extracted: usize,
    pub entities: Vec<String>,
    /// Id of the stored conversation-turn record, when one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// True when the completion collaborator failed and the extraction
    /// degraded to its empty fallback.
    pub degraded: bool,
}

impl ExtractionReport {
    /// Number of candidates that resulted in a store write.
    pub fn committed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    CommitOutcome::Added { .. }
                        | CommitOutcome::Updated { .. }
                        | CommitOutcome::Superseded { .. }
                )
            })
            .count()
    }
}

// ============================================================================
// Maintenance & health
// ============================================================================

/// Summary of one maintenance run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub total_records: usize,
    pub importance_updates: usize,
    pub clusters_found: usize,
    /// Records folded into consolidation summaries (and archived).
    pub consolidated: usize,
    pub archived: usize,
    pub expired: usize,
    /// True when the run was cancelled before completing.
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    /// Bucket a 0-100 health score.
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => HealthStatus::Excellent,
            60..=79 => HealthStatus::Good,
            40..=59 => HealthStatus::Fair,
            _ => HealthStatus::Poor,
        }
    }
}

/// Memory health metrics for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub total_memories: usize,
    pub active_memories: usize,
    pub archived_memories: usize,
    pub type_distribution: HashMap<String, usize>,
    pub avg_importance: f32,
    pub avg_decay_strength: f32,
    /// 0-100.
    pub health_score: u8,
    pub status: HealthStatus,
    pub recommendations: Vec<String>,
}
