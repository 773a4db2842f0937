//! Classification and Importance Estimation
//!
//! Keyword-driven heuristics for assigning a memory type and importance score
//! to raw text. Defined behind the `MemoryIntelligence` trait so a
//! model-backed implementation can replace the keyword tables without
//! touching callers.

use crate::models::memory::{MemoryType, DEFAULT_IMPORTANCE};

/// Pluggable classification/importance strategy.
pub trait MemoryIntelligence: Send + Sync {
    /// Assign a memory type to raw text.
    fn classify(&self, content: &str) -> MemoryType;

    /// Estimate importance in [0, 1]. `user_explicit` marks content the user
    /// directly asked to be remembered.
    fn score_importance(&self, content: &str, user_explicit: bool) -> f32;
}

/// Identity statements — checked first, highest priority.
const IDENTITY_KEYWORDS: &[&str] = &["my name is", "i am", "i'm", "i work as", "i live in"];

/// Preference indicators.
const PREFERENCE_KEYWORDS: &[&str] = &["i like", "i love", "i prefer", "i enjoy", "i hate", "allergic"];

/// Temporal-deictic words marking episodes.
const EPISODIC_KEYWORDS: &[&str] = &["today", "yesterday", "last", "this morning", "this evening"];

/// How-to phrasing.
const PROCEDURAL_KEYWORDS: &[&str] = &["how to", "steps", "procedure", "workflow"];

/// Deadline phrasing.
const TEMPORAL_KEYWORDS: &[&str] = &["until", "by", "deadline", "tomorrow", "next week"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Default keyword-table implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordIntelligence;

impl MemoryIntelligence for KeywordIntelligence {
    /// Ordered-priority matching, first match wins:
    /// identity > preference > episodic > procedural > temporal > fact.
    fn classify(&self, content: &str) -> MemoryType {
        let text = content.to_lowercase();

        if contains_any(&text, IDENTITY_KEYWORDS) {
            MemoryType::CoreIdentity
        } else if contains_any(&text, PREFERENCE_KEYWORDS) {
            MemoryType::Preference
        } else if contains_any(&text, EPISODIC_KEYWORDS) {
            MemoryType::Episodic
        } else if contains_any(&text, PROCEDURAL_KEYWORDS) {
            MemoryType::Procedural
        } else if contains_any(&text, TEMPORAL_KEYWORDS) {
            MemoryType::Temporal
        } else {
            MemoryType::Fact
        }
    }

    /// 0.5 baseline; +0.3 identity phrasing, +0.2 preference phrasing,
    /// +0.05 contains a digit, +0.1 user-explicit; clamped to [0, 1].
    fn score_importance(&self, content: &str, user_explicit: bool) -> f32 {
        if content.is_empty() {
            return DEFAULT_IMPORTANCE;
        }

        let text = content.to_lowercase();
        let mut score: f32 = 0.5;

        if contains_any(&text, IDENTITY_KEYWORDS) {
            score += 0.3;
        }
        if contains_any(&text, PREFERENCE_KEYWORDS) {
            score += 0.2;
        }
        if text.chars().any(|c| c.is_ascii_digit()) {
            score += 0.05;
        }
        if user_explicit {
            score += 0.1;
        }

        score.clamp(0.0, 1.0)
    }
}
