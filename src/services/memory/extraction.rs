//! Memory Extraction Pipeline
//!
//! Turns one conversation turn into candidate memories via the completion
//! collaborator, then commits each candidate through the conflict resolver.
//! A failed or malformed extraction degrades to an empty result — the
//! pipeline never raises for upstream trouble, and every dropped candidate
//! carries an attributable reason in the report.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ExtractionConfig;
use crate::models::memory::{CandidateMemory, MemoryRecord, MemoryType, SourceType};
use crate::models::report::{CommitOutcome, ExtractionReport};
use crate::services::llm::CompletionProvider;
use crate::services::memory::classify::MemoryIntelligence;
use crate::services::memory::conflict::{ConflictResolver, MemoryOperation};
use crate::services::memory::store::MemoryStore;
use crate::utils::error::EngineResult;

/// How many existing records to load per type when scanning for conflicts.
const CONFLICT_SCAN_LIMIT: usize = 50;

/// Structured output expected from the completion collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub facts: Vec<String>,
    pub preferences: Vec<String>,
    pub entities: Vec<String>,
    pub importance_score: f32,
    pub confidence: f32,
}

impl ExtractionOutput {
    /// Fallback when the collaborator fails or returns malformed output.
    pub fn empty() -> Self {
        Self {
            facts: Vec::new(),
            preferences: Vec::new(),
            entities: Vec::new(),
            importance_score: 0.0,
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.preferences.is_empty()
    }
}

/// Build the extraction prompt for one conversation turn.
pub fn build_extraction_prompt(
    user_text: &str,
    assistant_text: &str,
    config: &ExtractionConfig,
) -> String {
    format!(
        r#"You are a memory extraction system. Analyze the following conversation turn and extract information worth remembering about the user for future conversations.

## Conversation Turn
User: {user}
Assistant: {assistant}

---

Return a JSON object with this exact shape:
{{
  "facts": ["concise factual statement about the user or their world"],
  "preferences": ["something the user likes, dislikes or prefers"],
  "entities": ["named people, places, organizations or things mentioned"],
  "importance_score": 0.0,
  "confidence": 0.0
}}

Rules:
- Extract at most {max_facts} facts and {max_preferences} preferences
- Only include stable information worth recalling in later sessions
- Quote preferences close to the user's own words
- importance_score: how much this turn matters long-term, 0.0-1.0
- confidence: how certain the extraction is, 0.0-1.0
- Use empty arrays when nothing is worth extracting"#,
        user = user_text,
        assistant = assistant_text,
        max_facts = config.max_facts_per_turn,
        max_preferences = config.max_preferences_per_turn,
    )
}

/// Parse the collaborator's structured output, tolerating missing fields.
pub fn parse_extraction_output(value: &serde_json::Value) -> ExtractionOutput {
    let strings = |key: &str| -> Vec<String> {
        value
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    };

    ExtractionOutput {
        facts: strings("facts"),
        preferences: strings("preferences"),
        entities: strings("entities"),
        importance_score: value
            .get("importance_score")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.5)
            .clamp(0.0, 1.0) as f32,
        confidence: value
            .get("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0)
            .clamp(0.0, 1.0) as f32,
    }
}

/// Extraction pipeline wiring: classifier + conflict resolver + limits.
pub struct ExtractionPipeline<'a> {
    config: &'a ExtractionConfig,
    intelligence: &'a dyn MemoryIntelligence,
    resolver: &'a ConflictResolver,
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(
        config: &'a ExtractionConfig,
        intelligence: &'a dyn MemoryIntelligence,
        resolver: &'a ConflictResolver,
    ) -> Self {
        Self {
            config,
            intelligence,
            resolver,
        }
    }

    /// Call the collaborator; degrade to the empty fallback on any failure.
    async fn extract(
        &self,
        completion: &dyn CompletionProvider,
        user_text: &str,
        assistant_text: &str,
    ) -> (ExtractionOutput, bool) {
        let prompt = build_extraction_prompt(user_text, assistant_text, self.config);

        match completion.complete_structured(&prompt).await {
            Ok(Some(value)) => (parse_extraction_output(&value), false),
            Ok(None) => {
                warn!("extraction produced malformed output, using empty fallback");
                (ExtractionOutput::empty(), true)
            }
            Err(e) => {
                warn!(error = %e, "extraction service failed, using empty fallback");
                (ExtractionOutput::empty(), true)
            }
        }
    }

    /// Build candidate memories from extracted strings.
    ///
    /// Extracted preferences are explicit (the user's own statement); facts
    /// are inferred. The classifier assigns the type; the proposed
    /// importance is the extraction's own estimate scaled by its confidence,
    /// so an uncertain extraction can fall below the importance floor and be
    /// dropped by the resolver.
    pub fn build_candidates(&self, output: &ExtractionOutput) -> Vec<CandidateMemory> {
        let importance = (output.importance_score * output.confidence).clamp(0.0, 1.0);
        let mut candidates = Vec::new();

        for fact in output.facts.iter().take(self.config.max_facts_per_turn) {
            let memory_type = self.intelligence.classify(fact);
            candidates.push(
                CandidateMemory::new(fact.clone(), memory_type, importance, SourceType::Inferred)
                    .with_confidence(output.confidence)
                    .with_entities(output.entities.clone()),
            );
        }

        for preference in output
            .preferences
            .iter()
            .take(self.config.max_preferences_per_turn)
        {
            let memory_type = self.intelligence.classify(preference);
            candidates.push(
                CandidateMemory::new(
                    preference.clone(),
                    memory_type,
                    importance,
                    SourceType::Explicit,
                )
                .with_confidence(output.confidence)
                .with_entities(output.entities.clone()),
            );
        }

        candidates
    }

    /// Commit one candidate according to the resolver's decision.
    async fn commit(
        &self,
        store: &MemoryStore,
        candidate: &CandidateMemory,
    ) -> EngineResult<CommitOutcome> {
        let existing = store
            .list_by_type(candidate.memory_type, CONFLICT_SCAN_LIMIT)
            .await?;

        let outcome = match self.resolver.resolve(candidate, &existing) {
            MemoryOperation::Add => {
                let record = record_from_candidate(store.user_id(), candidate);
                store.put(&record).await?;
                CommitOutcome::Added {
                    id: record.id,
                    content: candidate.content.clone(),
                }
            }
            MemoryOperation::Update { target_id, reason } => {
                match store.get(&target_id).await? {
                    Some(mut record) => {
                        record.content = candidate.content.clone();
                        record.importance = record.importance.max(candidate.importance);
                        record.confidence = candidate.confidence;
                        for entity in &candidate.entities {
                            if !record.entities.contains(entity) {
                                record.entities.push(entity.clone());
                            }
                        }
                        record.updated_at = Some(Utc::now());
                        record.clamp_scores();
                        store.put(&record).await?;
                        CommitOutcome::Updated {
                            id: target_id,
                            content: candidate.content.clone(),
                            reason,
                        }
                    }
                    // The conflicting record vanished between scan and
                    // commit; fall back to a plain add.
                    None => {
                        let record = record_from_candidate(store.user_id(), candidate);
                        store.put(&record).await?;
                        CommitOutcome::Added {
                            id: record.id,
                            content: candidate.content.clone(),
                        }
                    }
                }
            }
            MemoryOperation::Supersede { target_id, .. } => {
                store.delete(&target_id).await?;
                let record = record_from_candidate(store.user_id(), candidate);
                store.put(&record).await?;
                CommitOutcome::Superseded {
                    deleted_id: target_id,
                    new_id: record.id,
                    content: candidate.content.clone(),
                }
            }
            MemoryOperation::Skip { reason } => CommitOutcome::Skipped {
                content: candidate.content.clone(),
                reason: reason.as_str().to_string(),
            },
        };

        Ok(outcome)
    }

    /// Process one conversation turn end to end.
    pub async fn record_turn(
        &self,
        store: &MemoryStore,
        completion: &dyn CompletionProvider,
        user_text: &str,
        assistant_text: &str,
    ) -> EngineResult<ExtractionReport> {
        let (output, degraded) = self.extract(completion, user_text, assistant_text).await;
        let candidates = self.build_candidates(&output);

        let mut report = ExtractionReport {
            facts_extracted: output.facts.len(),
            preferences_extracted: output.preferences.len(),
            entities: output.entities.clone(),
            degraded,
            ..Default::default()
        };

        for candidate in &candidates {
            match self.commit(store, candidate).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    warn!(error = %e, content = %candidate.content, "candidate commit failed");
                    report.outcomes.push(CommitOutcome::Failed {
                        content: candidate.content.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if self.config.store_conversation {
            let turn = format!("User: {}\nAssistant: {}", user_text, assistant_text);
            let record = MemoryRecord::new(
                store.user_id(),
                turn,
                MemoryType::Conversation,
                1.0,
                SourceType::Explicit,
            );
            match store.put(&record).await {
                Ok(()) => report.conversation_id = Some(record.id),
                Err(e) => warn!(error = %e, "conversation turn not stored"),
            }
        }

        Ok(report)
    }
}

/// Materialize a candidate into a fresh record.
fn record_from_candidate(user_id: &str, candidate: &CandidateMemory) -> MemoryRecord {
    MemoryRecord::new(
        user_id,
        candidate.content.clone(),
        candidate.memory_type,
        candidate.importance,
        candidate.source_type,
    )
    .with_confidence(candidate.confidence)
    .with_entities(candidate.entities.clone())
}
