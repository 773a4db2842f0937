//! Conflict Detection and Resolution
//!
//! Compares a candidate memory against existing records of the same type and
//! decides how it should be committed: stored fresh, merged into an older
//! record, or replacing a contradicted one. Candidates below the importance
//! floor are dropped before any scanning and never reach the store.

use crate::config::ConflictConfig;
use crate::models::memory::{CandidateMemory, MemoryRecord, SourceType};
use crate::utils::text::normalized_eq;

/// Kinds of conflict between a candidate and an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both texts are preference statements and they differ; the user's
    /// preference evolved.
    PreferenceEvolution,
    /// Incompatible factual claims about the same subject.
    DirectContradiction,
}

/// How a candidate should be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOperation {
    /// Store as a new record.
    Add,
    /// Rewrite the target record with the candidate's content.
    Update { target_id: String, reason: String },
    /// Delete the target record, then store the candidate as new.
    Supersede { target_id: String, reason: String },
    /// Do nothing; the reason is attributable in reports.
    Skip { reason: SkipReason },
}

/// Attributable reasons for dropping a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Importance below the configured floor.
    BelowImportanceFloor,
    /// An existing record already carries the same content.
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::BelowImportanceFloor => "importance below floor",
            SkipReason::Duplicate => "duplicate of existing memory",
        }
    }
}

/// Preference phrasing gate shared by detection on both sides of a pair.
const PREFERENCE_MARKERS: &[&str] = &["i prefer", "i like", "i love"];

fn is_preference_statement(text: &str) -> bool {
    let lower = text.to_lowercase();
    PREFERENCE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Conflict detector and resolver.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    config: ConflictConfig,
}

impl ConflictResolver {
    pub fn new(config: ConflictConfig) -> Self {
        Self { config }
    }

    /// Both texts express a preference and differ.
    fn detect_preference_evolution(&self, new_text: &str, existing_text: &str) -> bool {
        is_preference_statement(new_text)
            && is_preference_statement(existing_text)
            && !normalized_eq(new_text, existing_text)
    }

    /// Incompatible factual claims about the same subject.
    ///
    /// Not implemented: keyword matching cannot decide contradiction, this
    /// needs semantic entailment or subject/attribute extraction. Until then
    /// no direct contradictions are reported; the resolution policy below is
    /// exercised directly by its tests.
    fn detect_direct_contradiction(&self, _new_text: &str, _existing_text: &str) -> bool {
        false
    }

    /// First detected conflict against the existing set, in iteration order.
    /// Multiple simultaneous conflicts are not modeled.
    fn scan<'a>(
        &self,
        candidate: &CandidateMemory,
        existing: &'a [MemoryRecord],
    ) -> Option<(ConflictKind, &'a MemoryRecord)> {
        for record in existing {
            if record.memory_type != candidate.memory_type {
                continue;
            }
            if self.detect_preference_evolution(&candidate.content, &record.content) {
                return Some((ConflictKind::PreferenceEvolution, record));
            }
            if self.detect_direct_contradiction(&candidate.content, &record.content) {
                return Some((ConflictKind::DirectContradiction, record));
            }
        }
        None
    }

    /// Resolve a detected conflict into an operation.
    ///
    /// Preference evolution always updates the older record: the most recent
    /// explicit statement wins. Direct contradiction prefers explicit over
    /// inferred sources — an explicit candidate supersedes an inferred
    /// record; anything else updates in place.
    pub fn resolve_conflict(
        &self,
        kind: ConflictKind,
        candidate: &CandidateMemory,
        existing: &MemoryRecord,
    ) -> MemoryOperation {
        match kind {
            ConflictKind::PreferenceEvolution => MemoryOperation::Update {
                target_id: existing.id.clone(),
                reason: "preference evolution by recency".to_string(),
            },
            ConflictKind::DirectContradiction => {
                if candidate.source_type == SourceType::Explicit
                    && existing.source_type == SourceType::Inferred
                {
                    MemoryOperation::Supersede {
                        target_id: existing.id.clone(),
                        reason: "explicit statement supersedes inferred record".to_string(),
                    }
                } else {
                    MemoryOperation::Update {
                        target_id: existing.id.clone(),
                        reason: "direct conflict resolution".to_string(),
                    }
                }
            }
        }
    }

    /// Decide the commit operation for a candidate.
    ///
    /// Deterministic: identical (candidate, existing-set) inputs yield the
    /// identical operation.
    pub fn resolve(
        &self,
        candidate: &CandidateMemory,
        existing: &[MemoryRecord],
    ) -> MemoryOperation {
        if candidate.importance < self.config.importance_floor {
            return MemoryOperation::Skip {
                reason: SkipReason::BelowImportanceFloor,
            };
        }

        let duplicate = existing.iter().any(|r| {
            r.memory_type == candidate.memory_type && normalized_eq(&r.content, &candidate.content)
        });
        if duplicate {
            return MemoryOperation::Skip {
                reason: SkipReason::Duplicate,
            };
        }

        match self.scan(candidate, existing) {
            Some((kind, record)) => self.resolve_conflict(kind, candidate, record),
            None => MemoryOperation::Add,
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(ConflictConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::memory::{CandidateMemory, MemoryRecord, MemoryType};

    fn resolver() -> ConflictResolver {
        ConflictResolver::default()
    }

    fn preference_record(id: &str, content: &str) -> MemoryRecord {
        let mut record = MemoryRecord::new(
            "user-1",
            content,
            MemoryType::Preference,
            0.8,
            SourceType::Explicit,
        );
        record.id = id.to_string();
        record
    }

    fn preference_candidate(content: &str) -> CandidateMemory {
        CandidateMemory::new(content, MemoryType::Preference, 0.7, SourceType::Explicit)
    }

    #[test]
    fn test_below_floor_dropped_before_scanning() {
        let candidate = CandidateMemory::new(
            "I prefer tea",
            MemoryType::Preference,
            0.35,
            SourceType::Explicit,
        );
        let existing = vec![preference_record("old", "I prefer coffee")];

        let op = resolver().resolve(&candidate, &existing);
        assert_eq!(
            op,
            MemoryOperation::Skip {
                reason: SkipReason::BelowImportanceFloor
            }
        );
    }

    #[test]
    fn test_no_conflict_adds() {
        let candidate = preference_candidate("I prefer aisle seats");
        let op = resolver().resolve(&candidate, &[]);
        assert_eq!(op, MemoryOperation::Add);
    }

    #[test]
    fn test_preference_evolution_updates_older_record() {
        let candidate = preference_candidate("I prefer working in the office");
        let existing = vec![preference_record("old-1", "I prefer working from home")];

        let op = resolver().resolve(&candidate, &existing);
        match op {
            MemoryOperation::Update { target_id, .. } => assert_eq!(target_id, "old-1"),
            other => panic!("expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_identical_preference_is_duplicate_not_conflict() {
        let candidate = preference_candidate("I prefer working from home");
        let existing = vec![preference_record("old-1", "i prefer working from home")];

        let op = resolver().resolve(&candidate, &existing);
        assert_eq!(
            op,
            MemoryOperation::Skip {
                reason: SkipReason::Duplicate
            }
        );
    }

    #[test]
    fn test_different_type_never_conflicts() {
        let candidate = CandidateMemory::new(
            "I prefer tea",
            MemoryType::Preference,
            0.7,
            SourceType::Explicit,
        );
        let mut other_type = preference_record("old-1", "I prefer coffee");
        other_type.memory_type = MemoryType::Fact;

        let op = resolver().resolve(&candidate, &[other_type]);
        assert_eq!(op, MemoryOperation::Add);
    }

    #[test]
    fn test_first_conflict_wins_in_iteration_order() {
        let candidate = preference_candidate("I prefer trains");
        let existing = vec![
            preference_record("first", "I prefer planes"),
            preference_record("second", "I prefer cars"),
        ];

        let op = resolver().resolve(&candidate, &existing);
        match op {
            MemoryOperation::Update { target_id, .. } => assert_eq!(target_id, "first"),
            other => panic!("expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_deterministic() {
        let candidate = preference_candidate("I prefer tea");
        let existing = vec![preference_record("old-1", "I prefer coffee")];

        let first = resolver().resolve(&candidate, &existing);
        let second = resolver().resolve(&candidate, &existing);
        assert_eq!(first, second);
    }

    #[test]
    fn test_direct_contradiction_explicit_supersedes_inferred() {
        let candidate = CandidateMemory::new(
            "works at Acme",
            MemoryType::Fact,
            0.8,
            SourceType::Explicit,
        );
        let mut existing = preference_record("old-1", "works at Globex");
        existing.memory_type = MemoryType::Fact;
        existing.source_type = SourceType::Inferred;

        let op = resolver().resolve_conflict(
            ConflictKind::DirectContradiction,
            &candidate,
            &existing,
        );
        match op {
            MemoryOperation::Supersede { target_id, .. } => assert_eq!(target_id, "old-1"),
            other => panic!("expected Supersede, got {:?}", other),
        }
    }

    #[test]
    fn test_direct_contradiction_otherwise_updates() {
        let candidate = CandidateMemory::new(
            "works at Acme",
            MemoryType::Fact,
            0.8,
            SourceType::Inferred,
        );
        let mut existing = preference_record("old-1", "works at Globex");
        existing.memory_type = MemoryType::Fact;
        existing.source_type = SourceType::Explicit;

        let op = resolver().resolve_conflict(
            ConflictKind::DirectContradiction,
            &candidate,
            &existing,
        );
        assert!(matches!(op, MemoryOperation::Update { .. }));
    }

    #[test]
    fn test_contradiction_detector_reports_nothing() {
        // The detector is a stub pending semantic comparison; candidates with
        // clashing factual claims fall through to Add.
        let candidate =
            CandidateMemory::new("works at Acme", MemoryType::Fact, 0.8, SourceType::Explicit);
        let mut existing = preference_record("old-1", "works at Globex");
        existing.memory_type = MemoryType::Fact;
        existing.source_type = SourceType::Inferred;

        let op = resolver().resolve(&candidate, &[existing]);
        assert_eq!(op, MemoryOperation::Add);
    }
}
