//! Engine Configuration
//!
//! Every tuning knob the engine consults lives here as a named field with a
//! documented default, grouped by the component it drives. The defaults are
//! heuristics, not invariants; callers override them per deployment.

use serde::{Deserialize, Serialize};

use crate::utils::error::{EngineError, EngineResult};

/// Weights and thresholds for the multi-factor relevance scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Weight of the store-supplied semantic similarity.
    pub semantic_weight: f32,
    /// Weight of the time-decay recency factor.
    pub recency_weight: f32,
    /// Weight of the access-frequency bonus.
    pub access_weight: f32,
    /// Weight of the per-type weight factor.
    pub type_weight: f32,
    /// Weight of the extraction confidence factor.
    pub confidence_weight: f32,
    /// Type weight for preference records.
    pub preference_type_weight: f32,
    /// Type weight for fact records.
    pub fact_type_weight: f32,
    /// Type weight for every other record type.
    pub default_type_weight: f32,
    /// Candidates scoring below this are dropped.
    pub min_relevance: f32,
    /// Over-fetch factor against the store to survive filtering.
    pub candidate_multiplier: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.4,
            recency_weight: 0.2,
            access_weight: 0.1,
            type_weight: 0.2,
            confidence_weight: 0.1,
            preference_type_weight: 1.0,
            fact_type_weight: 0.9,
            default_type_weight: 0.7,
            min_relevance: 0.3,
            candidate_multiplier: 2,
        }
    }
}

/// Bonuses, blend ratios and selection thresholds for contextual ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextualConfig {
    /// Blend weight of the base relevance score.
    pub base_blend: f32,
    /// Blend weight of the contextual relevance score.
    pub contextual_blend: f32,
    /// Bonus when memory content matches the current topic's keywords.
    pub topic_bonus: f32,
    /// Bonus when memory content overlaps the recent conversation turns.
    pub flow_bonus: f32,
    /// Bonus when memory content matches an active user goal.
    pub goal_bonus: f32,
    /// Bonus when the record is session-recent.
    pub session_bonus: f32,
    /// Minimum shared words for the conversation-flow bonus.
    pub min_word_overlap: usize,
    /// Exchanges considered when comparing against recent turns.
    pub recent_exchanges: usize,
    /// A record last accessed within this many days counts as session-recent.
    pub session_recency_days: i64,
    /// Pass-1 selection threshold on the blended score.
    pub high_relevance_threshold: f32,
    /// Pass-2 backfill threshold on the blended score.
    pub backfill_threshold: f32,
}

impl Default for ContextualConfig {
    fn default() -> Self {
        Self {
            base_blend: 0.6,
            contextual_blend: 0.4,
            topic_bonus: 0.3,
            flow_bonus: 0.2,
            goal_bonus: 0.2,
            session_bonus: 0.1,
            min_word_overlap: 2,
            recent_exchanges: 5,
            session_recency_days: 7,
            high_relevance_threshold: 0.6,
            backfill_threshold: 0.5,
        }
    }
}

/// Conflict-resolution policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Candidates below this importance are dropped before conflict scanning.
    pub importance_floor: f32,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            importance_floor: 0.4,
        }
    }
}

/// Lifecycle maintenance thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Pairwise token-set Jaccard threshold for cluster membership.
    pub cluster_similarity_threshold: f32,
    /// Minimum cluster size eligible for consolidation.
    pub min_cluster_size: usize,
    /// Importance multiplier applied to a consolidation summary (capped at 1).
    pub consolidation_boost: f32,
    /// Records with decay strength below this expire.
    pub expiration_threshold: f32,
    /// Expired records above this importance are archived, not deleted.
    pub archive_importance_threshold: f32,
    /// Maximum records processed per maintenance run.
    pub batch_limit: usize,
    /// Consolidation summaries shorter than this are treated as degenerate.
    pub min_summary_chars: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cluster_similarity_threshold: 0.7,
            min_cluster_size: 3,
            consolidation_boost: 1.2,
            expiration_threshold: 0.1,
            archive_importance_threshold: 0.7,
            batch_limit: 1000,
            min_summary_chars: 10,
        }
    }
}

/// Extraction pipeline limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Facts accepted from one conversation turn.
    pub max_facts_per_turn: usize,
    /// Preferences accepted from one conversation turn.
    pub max_preferences_per_turn: usize,
    /// Whether the raw conversation turn is stored as a conversation record.
    pub store_conversation: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_facts_per_turn: 5,
            max_preferences_per_turn: 3,
            store_conversation: true,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub contextual: ContextualConfig,
    #[serde(default)]
    pub conflict: ConflictConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl EngineConfig {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> EngineResult<()> {
        let r = &self.retrieval;
        let weight_sum = r.semantic_weight
            + r.recency_weight
            + r.access_weight
            + r.type_weight
            + r.confidence_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(EngineError::config(format!(
                "retrieval weights must sum to 1.0, got {:.3}",
                weight_sum
            )));
        }
        if !(0.0..=1.0).contains(&r.min_relevance) {
            return Err(EngineError::config(
                "min_relevance must be within [0, 1]".to_string(),
            ));
        }
        if r.candidate_multiplier == 0 {
            return Err(EngineError::config(
                "candidate_multiplier must be at least 1".to_string(),
            ));
        }

        let c = &self.contextual;
        if (c.base_blend + c.contextual_blend - 1.0).abs() > 0.01 {
            return Err(EngineError::config(format!(
                "contextual blend weights must sum to 1.0, got {:.3}",
                c.base_blend + c.contextual_blend
            )));
        }
        if c.backfill_threshold > c.high_relevance_threshold {
            return Err(EngineError::config(
                "backfill_threshold must not exceed high_relevance_threshold".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.conflict.importance_floor) {
            return Err(EngineError::config(
                "importance_floor must be within [0, 1]".to_string(),
            ));
        }

        let l = &self.lifecycle;
        if !(0.0..=1.0).contains(&l.cluster_similarity_threshold) {
            return Err(EngineError::config(
                "cluster_similarity_threshold must be within [0, 1]".to_string(),
            ));
        }
        if l.min_cluster_size < 2 {
            return Err(EngineError::config(
                "min_cluster_size must be at least 2".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&l.expiration_threshold) {
            return Err(EngineError::config(
                "expiration_threshold must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}
