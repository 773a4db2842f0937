//! Memory Data Model
//!
//! Core record types for the per-user memory system: the persistent
//! `MemoryRecord`, the pre-commit `CandidateMemory`, and the memory type and
//! source classifications shared across scoring, conflict resolution and
//! lifecycle maintenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::{EngineError, EngineResult};

// ============================================================================
// Classifications
// ============================================================================

/// Categories of memory, ordered roughly by longevity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    CoreIdentity,
    Preference,
    Episodic,
    Procedural,
    Temporal,
    Fact,
    Conversation,
}

impl MemoryType {
    /// Convert to the string representation used at the store boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::CoreIdentity => "core_identity",
            MemoryType::Preference => "preference",
            MemoryType::Episodic => "episodic",
            MemoryType::Procedural => "procedural",
            MemoryType::Temporal => "temporal",
            MemoryType::Fact => "fact",
            MemoryType::Conversation => "conversation",
        }
    }

    /// Parse from the store's string representation.
    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "core_identity" => Ok(MemoryType::CoreIdentity),
            "preference" => Ok(MemoryType::Preference),
            "episodic" => Ok(MemoryType::Episodic),
            "procedural" => Ok(MemoryType::Procedural),
            "temporal" => Ok(MemoryType::Temporal),
            "fact" => Ok(MemoryType::Fact),
            "conversation" => Ok(MemoryType::Conversation),
            _ => Err(EngineError::validation(format!(
                "Invalid memory type: {}",
                s
            ))),
        }
    }

    /// All memory types, in longevity order.
    pub fn all() -> &'static [MemoryType] {
        &[
            MemoryType::CoreIdentity,
            MemoryType::Preference,
            MemoryType::Episodic,
            MemoryType::Procedural,
            MemoryType::Temporal,
            MemoryType::Fact,
            MemoryType::Conversation,
        ]
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a memory's content was directly stated by the user or derived by
/// the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Explicit,
    Inferred,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Explicit => "explicit",
            SourceType::Inferred => "inferred",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "explicit" => Ok(SourceType::Explicit),
            "inferred" => Ok(SourceType::Inferred),
            _ => Err(EngineError::validation(format!(
                "Invalid source type: {}",
                s
            ))),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Default importance for records created without an explicit score.
pub const DEFAULT_IMPORTANCE: f32 = 0.5;

/// A single persistent memory record.
///
/// Timestamps are optional because records round-trip through a scalar
/// metadata boundary; a missing or unparseable stored timestamp decodes to
/// `None` and downstream scoring treats it as neutral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub importance: f32,
    pub confidence: f32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub access_count: u32,
    pub last_accessed: Option<DateTime<Utc>>,
    /// Derived time-decay multiplier, recomputed by maintenance.
    pub decay_strength: f32,
    pub archived: bool,
    pub entities: Vec<String>,
    pub source_type: SourceType,
    /// Record ids this memory was consolidated from (empty otherwise).
    pub consolidated_from: Vec<String>,
    /// Back-reference to the consolidated content when this record was
    /// archived by consolidation.
    pub consolidated_into: Option<String>,
    /// Why this record was archived, when it was.
    pub archive_reason: Option<String>,
}

impl MemoryRecord {
    /// Create a fresh record with a generated id and current timestamps.
    pub fn new(
        user_id: impl Into<String>,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance: f32,
        source_type: SourceType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            content: content.into(),
            memory_type,
            importance: importance.clamp(0.0, 1.0),
            confidence: 1.0,
            created_at: Some(now),
            updated_at: Some(now),
            access_count: 0,
            last_accessed: Some(now),
            decay_strength: 1.0,
            archived: false,
            entities: Vec::new(),
            source_type,
            consolidated_from: Vec::new(),
            consolidated_into: None,
            archive_reason: None,
        }
    }

    /// Set the confidence score, clamped to [0,1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Attach extracted entities.
    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    /// Re-clamp the bounded fields. Called after any mutation of importance
    /// or confidence so the [0,1] invariant holds no matter the code path.
    pub fn clamp_scores(&mut self) {
        self.importance = self.importance.clamp(0.0, 1.0);
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}

/// A candidate memory produced by the extraction pipeline, not yet committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMemory {
    pub content: String,
    pub memory_type: MemoryType,
    pub importance: f32,
    pub confidence: f32,
    pub entities: Vec<String>,
    pub source_type: SourceType,
}

impl CandidateMemory {
    pub fn new(
        content: impl Into<String>,
        memory_type: MemoryType,
        importance: f32,
        source_type: SourceType,
    ) -> Self {
        Self {
            content: content.into(),
            memory_type,
            importance: importance.clamp(0.0, 1.0),
            confidence: 1.0,
            entities: Vec::new(),
            source_type,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_type_roundtrip() {
        for mt in MemoryType::all() {
            let parsed = MemoryType::parse(mt.as_str()).unwrap();
            assert_eq!(*mt, parsed);
        }
    }

    #[test]
    fn test_memory_type_invalid() {
        assert!(MemoryType::parse("invalid").is_err());
        // The boundary uses the long form, not the bare word "core".
        assert!(MemoryType::parse("core").is_err());
    }

    #[test]
    fn test_memory_type_serde_matches_boundary_string() {
        for mt in MemoryType::all() {
            let json = serde_json::to_string(mt).unwrap();
            assert_eq!(json, format!("\"{}\"", mt.as_str()));
        }
    }

    #[test]
    fn test_source_type_roundtrip() {
        assert_eq!(
            SourceType::parse("explicit").unwrap(),
            SourceType::Explicit
        );
        assert_eq!(SourceType::parse("inferred").unwrap(), SourceType::Inferred);
        assert!(SourceType::parse("consolidated").is_err());
    }

    #[test]
    fn test_new_record_defaults() {
        let record = MemoryRecord::new(
            "user-1",
            "I love hiking",
            MemoryType::Preference,
            0.8,
            SourceType::Explicit,
        );
        assert!(!record.id.is_empty());
        assert_eq!(record.user_id, "user-1");
        assert_eq!(record.access_count, 0);
        assert_eq!(record.confidence, 1.0);
        assert!(!record.archived);
        assert!(record.consolidated_from.is_empty());
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_record_importance_clamped() {
        let record = MemoryRecord::new(
            "user-1",
            "text",
            MemoryType::Fact,
            3.0,
            SourceType::Inferred,
        );
        assert_eq!(record.importance, 1.0);

        let mut record = record;
        record.importance = -0.5;
        record.confidence = 7.0;
        record.clamp_scores();
        assert_eq!(record.importance, 0.0);
        assert_eq!(record.confidence, 1.0);
    }

    #[test]
    fn test_candidate_builders() {
        let candidate = CandidateMemory::new(
            "I prefer tea",
            MemoryType::Preference,
            0.7,
            SourceType::Explicit,
        )
        .with_confidence(0.9)
        .with_entities(vec!["tea".into()]);

        assert_eq!(candidate.confidence, 0.9);
        assert_eq!(candidate.entities, vec!["tea"]);
    }
}
