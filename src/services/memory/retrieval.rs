//! Memory Retrieval and Ranking
//!
//! Multi-factor relevance scoring over candidates fetched from the vector
//! store: semantic similarity, per-type time decay, access frequency, type
//! weight and extraction confidence, scaled by importance.
//!
//! ## Search Flow
//!
//! 1. Embed the query and fetch over-provisioned candidates from the store
//! 2. Score each candidate with the combined formula
//! 3. Drop candidates below the caller's minimum relevance
//! 4. Sort by final score descending (stable, preserving store order on ties)
//! 5. Truncate to top_k
//! 6. Bump access_count and last_accessed for the returned records
//!    (best-effort; a failed bump is logged, not retried)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::models::memory::{MemoryRecord, MemoryType};
use crate::models::report::{RetrievalInsights, ScoreBreakdown, ScoredMemory};
use crate::services::memory::decay::{access_bonus, decay_strength};
use crate::services::memory::store::MemoryStore;
use crate::utils::error::EngineResult;

/// A retrieval request against one user's memories.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub top_k: usize,
    pub types: Option<Vec<MemoryType>>,
    /// Candidates scoring below this are dropped.
    pub min_relevance: f32,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            types: None,
            min_relevance: RetrievalConfig::default().min_relevance,
        }
    }

    pub fn with_types(mut self, types: Vec<MemoryType>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }
}

/// Per-type weight in the relevance formula.
pub fn type_weight(config: &RetrievalConfig, memory_type: MemoryType) -> f32 {
    match memory_type {
        MemoryType::Preference => config.preference_type_weight,
        MemoryType::Fact => config.fact_type_weight,
        _ => config.default_type_weight,
    }
}

/// Relevance scoring formula:
///
///   final = ( semantic * w_semantic
///           + recency * w_recency
///           + access_bonus * w_access
///           + type_weight * w_type
///           + confidence * w_confidence ) * importance
///
/// clamped to [0, 1]. Strictly increasing in `semantic` while importance > 0
/// and the semantic weight is positive.
pub fn compute_relevance_score(
    config: &RetrievalConfig,
    semantic: f32,
    recency: f32,
    access: f32,
    type_w: f32,
    confidence: f32,
    importance: f32,
) -> f32 {
    let combined = semantic * config.semantic_weight
        + recency * config.recency_weight
        + access * config.access_weight
        + type_w * config.type_weight
        + confidence * config.confidence_weight;

    (combined * importance).clamp(0.0, 1.0)
}

/// Score one candidate, attaching the per-factor breakdown.
pub fn score_candidate(
    config: &RetrievalConfig,
    record: MemoryRecord,
    similarity: f32,
    now: DateTime<Utc>,
) -> ScoredMemory {
    let recency = decay_strength(record.created_at, record.memory_type, now);
    let access = access_bonus(record.access_count);
    let type_w = type_weight(config, record.memory_type);

    let final_score = compute_relevance_score(
        config,
        similarity,
        recency,
        access,
        type_w,
        record.confidence,
        record.importance,
    );

    let breakdown = ScoreBreakdown {
        semantic: similarity,
        recency,
        access_bonus: access,
        type_weight: type_w,
        confidence: record.confidence,
        importance: record.importance,
        final_score,
    };

    ScoredMemory {
        record,
        relevance: final_score,
        breakdown,
        contextual_relevance: None,
        blended_score: None,
    }
}

/// Run a full retrieval pass against the store.
pub async fn search_memories(
    store: &MemoryStore,
    config: &RetrievalConfig,
    request: &RetrievalRequest,
    now: DateTime<Utc>,
) -> EngineResult<Vec<ScoredMemory>> {
    // Over-fetch so min-relevance filtering still leaves enough candidates.
    let fetch_k = request.top_k.saturating_mul(config.candidate_multiplier).max(1);
    let candidates = store
        .search(&request.query, fetch_k, request.types.as_deref())
        .await?;

    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|(record, similarity)| score_candidate(config, record, similarity, now))
        .filter(|s| s.relevance >= request.min_relevance)
        .collect();

    // Stable sort keeps the store's ranking for equal scores.
    scored.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(request.top_k);

    for memory in &scored {
        match store.bump_access(&memory.record.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(id = %memory.record.id, "access bump skipped: record vanished");
            }
            Err(e) => {
                warn!(id = %memory.record.id, error = %e, "access bump failed");
            }
        }
    }

    Ok(scored)
}

/// Aggregate insights over a scored result set.
pub fn retrieval_insights(candidates: usize, selected: &[ScoredMemory]) -> RetrievalInsights {
    let mut type_distribution: HashMap<String, usize> = HashMap::new();
    let mut entity_counts: HashMap<String, usize> = HashMap::new();

    for memory in selected {
        *type_distribution
            .entry(memory.record.memory_type.as_str().to_string())
            .or_insert(0) += 1;
        for entity in &memory.record.entities {
            *entity_counts.entry(entity.clone()).or_insert(0) += 1;
        }
    }

    let mut top_entities: Vec<(String, usize)> = entity_counts.into_iter().collect();
    top_entities.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_entities.truncate(5);

    let count = selected.len();
    let (avg_relevance, avg_importance) = if count == 0 {
        (0.0, 0.0)
    } else {
        (
            selected.iter().map(|m| m.effective_score()).sum::<f32>() / count as f32,
            selected.iter().map(|m| m.record.importance).sum::<f32>() / count as f32,
        )
    };

    let type_diversity = if count == 0 {
        0.0
    } else {
        type_distribution.len() as f32 / count as f32
    };

    RetrievalInsights {
        total_candidates: candidates,
        selected_count: count,
        type_diversity,
        avg_relevance,
        avg_importance,
        type_distribution,
        top_entities,
        context_coherence: None,
        topic_shift: None,
        current_topic: None,
    }
}
