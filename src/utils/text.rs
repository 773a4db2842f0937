//! Text Utilities
//!
//! Tokenization and lexical-overlap helpers shared by conflict detection,
//! contextual ranking and consolidation clustering.

use std::collections::HashSet;

/// Split text into a lowercase token set (whitespace-delimited words).
pub fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Token-set Jaccard similarity between two texts.
///
/// Returns |intersection| / |union|, or 0.0 if either text has no tokens.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Number of distinct lowercase words two texts share.
pub fn word_overlap(a: &str, b: &str) -> usize {
    let set_a = token_set(a);
    let set_b = token_set(b);
    set_a.intersection(&set_b).count()
}

/// Case-insensitive whole-text equality after whitespace normalization.
pub fn normalized_eq(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    norm(a) == norm(b)
}
