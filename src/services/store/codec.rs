//! Metadata Codec
//!
//! The single adapter between `MemoryRecord` and the store's scalar-only
//! metadata maps. List-valued fields (entities, consolidation lineage) are
//! flattened to delimited strings here and decoded here; no other module
//! touches the encoding.

use chrono::{DateTime, Utc};

use crate::models::memory::{MemoryRecord, MemoryType, SourceType, DEFAULT_IMPORTANCE};
use crate::services::store::{MetadataMap, MetadataValue};

pub const KEY_USER_ID: &str = "user_id";
pub const KEY_MEMORY_TYPE: &str = "memory_type";
pub const KEY_IMPORTANCE: &str = "importance";
pub const KEY_CONFIDENCE: &str = "confidence";
pub const KEY_CREATED_AT: &str = "created_at";
pub const KEY_UPDATED_AT: &str = "updated_at";
pub const KEY_ACCESS_COUNT: &str = "access_count";
pub const KEY_LAST_ACCESSED: &str = "last_accessed";
pub const KEY_DECAY_STRENGTH: &str = "decay_strength";
pub const KEY_ARCHIVED: &str = "archived";
pub const KEY_ENTITIES: &str = "entities";
pub const KEY_SOURCE_TYPE: &str = "source_type";
pub const KEY_CONSOLIDATED_FROM: &str = "consolidated_from";
pub const KEY_CONSOLIDATED_INTO: &str = "consolidated_into";
pub const KEY_ARCHIVE_REASON: &str = "archive_reason";
pub const KEY_LAST_MAINTENANCE: &str = "last_maintenance";

/// Delimiter for list-valued fields at the scalar boundary.
const LIST_SEPARATOR: &str = ",";

/// Encode a list as a delimited string. Empty list encodes to "".
pub fn encode_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Decode a delimited string back to a list, dropping empty segments.
pub fn decode_list(encoded: &str) -> Vec<String> {
    encoded
        .split(LIST_SEPARATOR)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn encode_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

fn decode_timestamp(metadata: &MetadataMap, key: &str) -> Option<DateTime<Utc>> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Flatten a record into scalar metadata for the store.
pub fn record_to_metadata(record: &MemoryRecord) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    metadata.insert(KEY_USER_ID.into(), record.user_id.as_str().into());
    metadata.insert(
        KEY_MEMORY_TYPE.into(),
        record.memory_type.as_str().into(),
    );
    metadata.insert(KEY_IMPORTANCE.into(), record.importance.into());
    metadata.insert(KEY_CONFIDENCE.into(), record.confidence.into());
    metadata.insert(KEY_ACCESS_COUNT.into(), record.access_count.into());
    metadata.insert(KEY_DECAY_STRENGTH.into(), record.decay_strength.into());
    metadata.insert(KEY_ARCHIVED.into(), record.archived.into());
    metadata.insert(
        KEY_ENTITIES.into(),
        encode_list(&record.entities).into(),
    );
    metadata.insert(
        KEY_SOURCE_TYPE.into(),
        record.source_type.as_str().into(),
    );
    metadata.insert(
        KEY_CONSOLIDATED_FROM.into(),
        encode_list(&record.consolidated_from).into(),
    );

    if let Some(ts) = encode_timestamp(record.created_at) {
        metadata.insert(KEY_CREATED_AT.into(), ts.into());
    }
    if let Some(ts) = encode_timestamp(record.updated_at) {
        metadata.insert(KEY_UPDATED_AT.into(), ts.into());
    }
    if let Some(ts) = encode_timestamp(record.last_accessed) {
        metadata.insert(KEY_LAST_ACCESSED.into(), ts.into());
    }
    if let Some(ref into) = record.consolidated_into {
        metadata.insert(KEY_CONSOLIDATED_INTO.into(), into.as_str().into());
    }
    if let Some(ref reason) = record.archive_reason {
        metadata.insert(KEY_ARCHIVE_REASON.into(), reason.as_str().into());
    }

    metadata
}

/// Rebuild a record from stored text and metadata.
///
/// Tolerant of missing or malformed fields: unknown types fall back to
/// `fact`, bad timestamps decode to `None`, scores fall back to defaults and
/// are clamped. A record that round-trips through a partially corrupted
/// store still participates in scoring with neutral values.
pub fn metadata_to_record(id: &str, text: &str, metadata: &MetadataMap) -> MemoryRecord {
    let memory_type = metadata
        .get(KEY_MEMORY_TYPE)
        .and_then(|v| v.as_str())
        .and_then(|s| MemoryType::parse(s).ok())
        .unwrap_or(MemoryType::Fact);

    let source_type = metadata
        .get(KEY_SOURCE_TYPE)
        .and_then(|v| v.as_str())
        .and_then(|s| SourceType::parse(s).ok())
        .unwrap_or(SourceType::Explicit);

    let importance = metadata
        .get(KEY_IMPORTANCE)
        .and_then(|v| v.as_f64())
        .unwrap_or(DEFAULT_IMPORTANCE as f64) as f32;

    let confidence = metadata
        .get(KEY_CONFIDENCE)
        .and_then(|v| v.as_f64())
        .unwrap_or(1.0) as f32;

    let access_count = metadata
        .get(KEY_ACCESS_COUNT)
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        .max(0) as u32;

    let decay_strength = metadata
        .get(KEY_DECAY_STRENGTH)
        .and_then(|v| v.as_f64())
        .unwrap_or(1.0) as f32;

    let archived = metadata
        .get(KEY_ARCHIVED)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let entities = metadata
        .get(KEY_ENTITIES)
        .and_then(|v| v.as_str())
        .map(decode_list)
        .unwrap_or_default();

    let consolidated_from = metadata
        .get(KEY_CONSOLIDATED_FROM)
        .and_then(|v| v.as_str())
        .map(decode_list)
        .unwrap_or_default();

    let consolidated_into = metadata
        .get(KEY_CONSOLIDATED_INTO)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let archive_reason = metadata
        .get(KEY_ARCHIVE_REASON)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let user_id = metadata
        .get(KEY_USER_ID)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    MemoryRecord {
        id: id.to_string(),
        user_id,
        content: text.to_string(),
        memory_type,
        importance: importance.clamp(0.0, 1.0),
        confidence: confidence.clamp(0.0, 1.0),
        created_at: decode_timestamp(metadata, KEY_CREATED_AT),
        updated_at: decode_timestamp(metadata, KEY_UPDATED_AT),
        access_count,
        last_accessed: decode_timestamp(metadata, KEY_LAST_ACCESSED),
        decay_strength: decay_strength.clamp(0.0, 1.0),
        archived,
        entities,
        source_type,
        consolidated_from,
        consolidated_into,
        archive_reason,
    }
}
