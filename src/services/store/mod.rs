//! Vector Store Boundary
//!
//! The engine delegates persistence and nearest-neighbor search to an
//! external vector store, reached only through the object-safe [`VectorStore`]
//! trait defined here. Metadata at this boundary is scalar-only; list-valued
//! fields are flattened by the codec module and nowhere else.
//!
//! ## Module Structure
//!
//! - `codec` — the single adapter between `MemoryRecord` and scalar metadata
//! - `memory` — in-memory reference implementation with exact cosine ranking

pub mod codec;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::memory::MemoryType;
use crate::utils::error::EngineResult;

pub use memory::InMemoryVectorStore;

/// A scalar metadata value. The store boundary accepts nothing richer;
/// lists are encoded as delimited strings by the codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Str(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<f32> for MetadataValue {
    fn from(v: f32) -> Self {
        MetadataValue::Float(v as f64)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<u32> for MetadataValue {
    fn from(v: u32) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

/// Scalar metadata map stored alongside each vector.
pub type MetadataMap = HashMap<String, MetadataValue>;

/// A stored item without similarity information (from `get` calls).
#[derive(Debug, Clone)]
pub struct StoredItem {
    pub id: String,
    pub text: String,
    pub metadata: MetadataMap,
}

/// A ranked query hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub text: String,
    pub metadata: MetadataMap,
    pub similarity: f32,
}

/// Filter over stored records; all present fields must match.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub user_id: Option<String>,
    pub memory_types: Option<Vec<MemoryType>>,
    /// When false (default) archived records are excluded.
    pub include_archived: bool,
}

impl RecordFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn with_types(mut self, types: Vec<MemoryType>) -> Self {
        self.memory_types = Some(types);
        self
    }

    pub fn include_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }
}

/// External vector similarity store.
///
/// Object-safe and `Send + Sync` so implementations can be shared across
/// tasks behind an `Arc`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a record. Overwrites an existing record with the same id.
    async fn add(
        &self,
        id: &str,
        text: &str,
        embedding: Vec<f32>,
        metadata: MetadataMap,
    ) -> EngineResult<()>;

    /// Nearest-neighbor search, filtered, ranked by similarity descending.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: &RecordFilter,
    ) -> EngineResult<Vec<VectorHit>>;

    /// Fetch records matching a filter (no ranking), up to `limit`.
    /// Ordering is stable: oldest created first, ties broken by id.
    async fn get(&self, filter: &RecordFilter, limit: usize) -> EngineResult<Vec<StoredItem>>;

    /// Fetch one record by id.
    async fn get_by_id(&self, id: &str) -> EngineResult<Option<StoredItem>>;

    /// Merge the given keys into a record's metadata.
    /// Returns false when the record does not exist.
    async fn update_metadata(&self, id: &str, updates: MetadataMap) -> EngineResult<bool>;

    /// Delete a record. Returns false when the record does not exist.
    async fn delete(&self, id: &str) -> EngineResult<bool>;

    /// Total number of stored records.
    async fn count(&self) -> EngineResult<usize>;

    /// Dimensionality of the stored vectors, or None while empty.
    async fn dimension(&self) -> EngineResult<Option<usize>>;
}
