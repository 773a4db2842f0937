//! Contextual Ranking and Diversity Selection
//!
//! Re-scores base retrieval results against the live conversation state
//! (topic, recent turns, active goals, session recency), blends the result
//! with the base relevance, and selects a type-diverse top-k. The selection
//! deliberately trades pure relevance for type diversity.

use chrono::{DateTime, Duration, Utc};

use crate::config::ContextualConfig;
use crate::models::context::{ConversationContext, Topic, TopicFlow};
use crate::models::memory::{MemoryRecord, MemoryType};
use crate::models::report::{RetrievalInsights, ScoredMemory};
use crate::services::memory::retrieval;
use crate::utils::text::word_overlap;

/// Type×topic weight multiplier. Core identity is always boosted; other
/// types only when the conversation topic matches their domain.
fn type_topic_weight(memory_type: MemoryType, topic: Topic) -> f32 {
    match (memory_type, topic) {
        (MemoryType::CoreIdentity, _) => 1.5,
        (MemoryType::Preference, Topic::Personal) => 1.3,
        (MemoryType::Fact, Topic::Work) | (MemoryType::Fact, Topic::Support) => 1.2,
        (MemoryType::Episodic, Topic::General) => 1.1,
        _ => 1.0,
    }
}

/// Context-aware re-ranker.
#[derive(Debug, Clone)]
pub struct ContextualRanker {
    config: ContextualConfig,
}

impl ContextualRanker {
    pub fn new(config: ContextualConfig) -> Self {
        Self { config }
    }

    fn memory_matches_topic(&self, content: &str, topic: Topic) -> bool {
        let lower = content.to_lowercase();
        topic.content_keywords().iter().any(|k| lower.contains(k))
    }

    fn memory_matches_goals(&self, content: &str, goals: &[String]) -> bool {
        let lower = content.to_lowercase();
        goals
            .iter()
            .any(|goal| !goal.trim().is_empty() && lower.contains(&goal.to_lowercase()))
    }

    /// Created during this session, or accessed within the recency window.
    fn is_session_recent(
        &self,
        record: &MemoryRecord,
        context: &ConversationContext,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(created) = record.created_at {
            if created >= context.session_start {
                return true;
            }
        }
        if let Some(accessed) = record.last_accessed {
            if now - accessed < Duration::days(self.config.session_recency_days) {
                return true;
            }
        }
        false
    }

    /// Contextual relevance in [0, 1] for one record.
    fn contextual_score(
        &self,
        record: &MemoryRecord,
        context: &ConversationContext,
        flow: &TopicFlow,
        recent_text: &str,
        now: DateTime<Utc>,
    ) -> f32 {
        let mut score = 0.0;

        if self.memory_matches_topic(&record.content, flow.current_topic) {
            score += self.config.topic_bonus;
        }
        if !recent_text.is_empty()
            && word_overlap(&record.content, recent_text) >= self.config.min_word_overlap
        {
            score += self.config.flow_bonus;
        }
        if self.memory_matches_goals(&record.content, &context.active_goals) {
            score += self.config.goal_bonus;
        }
        if self.is_session_recent(record, context, now) {
            score += self.config.session_bonus;
        }

        score *= type_topic_weight(record.memory_type, flow.current_topic);
        score.clamp(0.0, 1.0)
    }

    /// Attach contextual and blended scores to every candidate and re-sort
    /// by the blended score descending.
    pub fn rank(
        &self,
        mut candidates: Vec<ScoredMemory>,
        context: &ConversationContext,
        now: DateTime<Utc>,
    ) -> Vec<ScoredMemory> {
        let flow = context.topic_flow();
        let recent_text = context.recent_text(self.config.recent_exchanges);

        for memory in &mut candidates {
            let contextual =
                self.contextual_score(&memory.record, context, &flow, &recent_text, now);
            memory.contextual_relevance = Some(contextual);
            memory.blended_score = Some(
                memory.relevance * self.config.base_blend
                    + contextual * self.config.contextual_blend,
            );
        }

        candidates.sort_by(|a, b| {
            b.effective_score()
                .partial_cmp(&a.effective_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }

    /// Two-pass selection over ranked candidates; never returns more than
    /// `target_k`.
    ///
    /// Pass 1 takes every candidate at or above the high-relevance threshold
    /// (no type cap). Pass 2 fills the remaining slots, preferring one
    /// representative of each memory type not yet selected, then backfills
    /// with the next-highest candidates above the backfill threshold. The
    /// final set is re-sorted by blended score.
    pub fn select(&self, ranked: Vec<ScoredMemory>, target_k: usize) -> Vec<ScoredMemory> {
        if target_k == 0 {
            return Vec::new();
        }
        if ranked.len() <= target_k {
            return ranked;
        }

        let mut selected: Vec<ScoredMemory> = Vec::with_capacity(target_k);
        let mut remaining: Vec<ScoredMemory> = Vec::new();

        for memory in ranked {
            if selected.len() < target_k
                && memory.effective_score() >= self.config.high_relevance_threshold
            {
                selected.push(memory);
            } else {
                remaining.push(memory);
            }
        }

        // Pass 2a: one representative per type not yet covered.
        if selected.len() < target_k {
            let mut types_seen: Vec<MemoryType> =
                selected.iter().map(|m| m.record.memory_type).collect();
            let mut leftovers: Vec<ScoredMemory> = Vec::new();

            for memory in remaining {
                if selected.len() < target_k && !types_seen.contains(&memory.record.memory_type) {
                    types_seen.push(memory.record.memory_type);
                    selected.push(memory);
                } else {
                    leftovers.push(memory);
                }
            }

            // Pass 2b: backfill with the next-highest qualifying candidates.
            for memory in leftovers {
                if selected.len() >= target_k {
                    break;
                }
                if memory.effective_score() >= self.config.backfill_threshold {
                    selected.push(memory);
                }
            }
        }

        selected.sort_by(|a, b| {
            b.effective_score()
                .partial_cmp(&a.effective_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        selected
    }

    /// Insights over a contextual retrieval pass.
    pub fn insights(
        &self,
        total_candidates: usize,
        selected: &[ScoredMemory],
        context: &ConversationContext,
    ) -> RetrievalInsights {
        let flow = context.topic_flow();
        let mut insights = retrieval::retrieval_insights(total_candidates, selected);
        insights.context_coherence = Some(flow.coherence);
        insights.topic_shift = Some(flow.topic_shift);
        insights.current_topic = Some(flow.current_topic.as_str().to_string());
        insights
    }
}

impl Default for ContextualRanker {
    fn default() -> Self {
        Self::new(ContextualConfig::default())
    }
}
