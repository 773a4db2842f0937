//! Temporal Decay Model
//!
//! Exponential time decay with a per-type half-life, plus the two
//! access-frequency terms derived from it:
//!
//! - `access_boost` — multiplicative boost used by lifecycle maintenance,
//!   range [1.0, 1.5]
//! - `access_bonus` — additive bonus used by retrieval scoring,
//!   range [0.0, 0.5]

use chrono::{DateTime, Utc};

use crate::models::memory::MemoryType;

/// Neutral decay value for records whose timestamp is missing or was
/// unparseable. Deliberately not 1.0: malformed records must not outrank
/// well-formed recent ones.
pub const NEUTRAL_DECAY: f32 = 0.5;

/// Half-life in days per memory type.
pub fn half_life_days(memory_type: MemoryType) -> f64 {
    match memory_type {
        MemoryType::CoreIdentity => 3650.0,
        MemoryType::Procedural => 1095.0,
        MemoryType::Fact => 730.0,
        MemoryType::Preference => 365.0,
        MemoryType::Episodic => 90.0,
        MemoryType::Temporal => 14.0,
        MemoryType::Conversation => 7.0,
    }
}

/// Time-decay strength in (0, 1] for a record of the given type and age.
///
/// `exp(-ln(2)/half_life * age_days)`; a record exactly one half-life old
/// scores 0.5. Missing timestamps return [`NEUTRAL_DECAY`]; timestamps in
/// the future clamp to zero age.
pub fn decay_strength(
    created_at: Option<DateTime<Utc>>,
    memory_type: MemoryType,
    now: DateTime<Utc>,
) -> f32 {
    let Some(created) = created_at else {
        return NEUTRAL_DECAY;
    };

    let age_days = (now - created).num_seconds().max(0) as f64 / 86_400.0;
    let decay_rate = std::f64::consts::LN_2 / half_life_days(memory_type);
    (-decay_rate * age_days).exp() as f32
}

/// Multiplicative access boost for importance maintenance.
///
/// `min(1 + ln(n+1)*0.1, 1.5)` — monotonically non-decreasing, capped.
pub fn access_boost(access_count: u32) -> f32 {
    let boost = 1.0 + ((access_count as f64 + 1.0).ln() * 0.1) as f32;
    boost.min(1.5)
}

/// Additive access-frequency bonus for retrieval scoring.
///
/// `min(ln(n+1)*0.1, 0.5)` — diminishing returns, capped.
pub fn access_bonus(access_count: u32) -> f32 {
    (((access_count as f64 + 1.0).ln() * 0.1) as f32).min(0.5)
}
