//! In-Memory Vector Store
//!
//! Reference `VectorStore` implementation backed by a `BTreeMap` with exact
//! cosine ranking. Used by the test suites and as a local backend for small
//! deployments. Enforces a fixed embedding dimension: the first stored vector
//! pins the dimension and any mismatch afterwards is a configuration error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::services::store::codec::{KEY_ARCHIVED, KEY_CREATED_AT, KEY_MEMORY_TYPE, KEY_USER_ID};
use crate::services::store::{
    MetadataMap, RecordFilter, StoredItem, VectorHit, VectorStore,
};
use crate::utils::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    embedding: Vec<f32>,
    metadata: MetadataMap,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    dimension: Option<usize>,
}

/// Exact-similarity in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

fn matches_filter(metadata: &MetadataMap, filter: &RecordFilter) -> bool {
    if let Some(ref user_id) = filter.user_id {
        if metadata.get(KEY_USER_ID).and_then(|v| v.as_str()) != Some(user_id.as_str()) {
            return false;
        }
    }

    if let Some(ref types) = filter.memory_types {
        let stored = metadata.get(KEY_MEMORY_TYPE).and_then(|v| v.as_str());
        let matched = stored
            .map(|s| types.iter().any(|t| t.as_str() == s))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }

    if !filter.include_archived {
        let archived = metadata
            .get(KEY_ARCHIVED)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if archived {
            return false;
        }
    }

    true
}

/// Sort key for `get`: created_at ascending (missing timestamps last), then id.
fn created_key(metadata: &MetadataMap) -> String {
    metadata
        .get(KEY_CREATED_AT)
        .and_then(|v| v.as_str())
        .unwrap_or("\u{10FFFF}")
        .to_string()
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(
        &self,
        id: &str,
        text: &str,
        embedding: Vec<f32>,
        metadata: MetadataMap,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;

        if let Some(dim) = inner.dimension {
            if embedding.len() != dim {
                return Err(EngineError::config(format!(
                    "embedding dimension mismatch: store holds {}-dimensional vectors, got {}",
                    dim,
                    embedding.len()
                )));
            }
        } else if !embedding.is_empty() {
            inner.dimension = Some(embedding.len());
        }

        inner.entries.insert(
            id.to_string(),
            Entry {
                text: text.to_string(),
                embedding,
                metadata,
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: &RecordFilter,
    ) -> EngineResult<Vec<VectorHit>> {
        let inner = self.inner.read().await;

        if let Some(dim) = inner.dimension {
            if embedding.len() != dim {
                return Err(EngineError::config(format!(
                    "query dimension mismatch: store holds {}-dimensional vectors, got {}",
                    dim,
                    embedding.len()
                )));
            }
        }

        let mut hits: Vec<VectorHit> = inner
            .entries
            .iter()
            .filter(|(_, e)| matches_filter(&e.metadata, filter))
            .map(|(id, e)| VectorHit {
                id: id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                similarity: cosine_similarity(embedding, &e.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn get(&self, filter: &RecordFilter, limit: usize) -> EngineResult<Vec<StoredItem>> {
        let inner = self.inner.read().await;

        let mut items: Vec<StoredItem> = inner
            .entries
            .iter()
            .filter(|(_, e)| matches_filter(&e.metadata, filter))
            .map(|(id, e)| StoredItem {
                id: id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
            })
            .collect();

        items.sort_by(|a, b| {
            (created_key(&a.metadata), &a.id).cmp(&(created_key(&b.metadata), &b.id))
        });
        items.truncate(limit);
        Ok(items)
    }

    async fn get_by_id(&self, id: &str) -> EngineResult<Option<StoredItem>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(id).map(|e| StoredItem {
            id: id.to_string(),
            text: e.text.clone(),
            metadata: e.metadata.clone(),
        }))
    }

    async fn update_metadata(&self, id: &str, updates: MetadataMap) -> EngineResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(id) {
            Some(entry) => {
                entry.metadata.extend(updates);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> EngineResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.entries.remove(id).is_some())
    }

    async fn count(&self) -> EngineResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner.entries.len())
    }

    async fn dimension(&self) -> EngineResult<Option<usize>> {
        let inner = self.inner.read().await;
        Ok(inner.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::memory::MemoryType;
    use crate::services::store::MetadataValue;

    fn meta(user: &str, mtype: &str, archived: bool) -> MetadataMap {
        let mut m = MetadataMap::new();
        m.insert(KEY_USER_ID.into(), user.into());
        m.insert(KEY_MEMORY_TYPE.into(), mtype.into());
        m.insert(KEY_ARCHIVED.into(), archived.into());
        m
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_add_and_query_ranked() {
        let store = InMemoryVectorStore::new();
        store
            .add("a", "close", vec![1.0, 0.0], meta("u1", "fact", false))
            .await
            .unwrap();
        store
            .add("b", "far", vec![0.0, 1.0], meta("u1", "fact", false))
            .await
            .unwrap();

        let hits = store
            .query(&[1.0, 0.1], 10, &RecordFilter::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn test_query_respects_k_and_user_filter() {
        let store = InMemoryVectorStore::new();
        for i in 0..5 {
            store
                .add(
                    &format!("id-{}", i),
                    "text",
                    vec![1.0, 0.0],
                    meta("u1", "fact", false),
                )
                .await
                .unwrap();
        }
        store
            .add("other", "text", vec![1.0, 0.0], meta("u2", "fact", false))
            .await
            .unwrap();

        let hits = store
            .query(&[1.0, 0.0], 3, &RecordFilter::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.id.starts_with("id-")));
    }

    #[tokio::test]
    async fn test_archived_excluded_by_default() {
        let store = InMemoryVectorStore::new();
        store
            .add("live", "text", vec![1.0], meta("u1", "fact", false))
            .await
            .unwrap();
        store
            .add("gone", "text", vec![1.0], meta("u1", "fact", true))
            .await
            .unwrap();

        let hits = store
            .query(&[1.0], 10, &RecordFilter::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "live");

        let all = store
            .get(&RecordFilter::for_user("u1").include_archived(), 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_type_filter() {
        let store = InMemoryVectorStore::new();
        store
            .add("p", "text", vec![1.0], meta("u1", "preference", false))
            .await
            .unwrap();
        store
            .add("f", "text", vec![1.0], meta("u1", "fact", false))
            .await
            .unwrap();

        let filter = RecordFilter::for_user("u1").with_types(vec![MemoryType::Preference]);
        let hits = store.query(&[1.0], 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p");
    }

    #[tokio::test]
    async fn test_dimension_enforced() {
        let store = InMemoryVectorStore::new();
        store
            .add("a", "text", vec![1.0, 0.0], meta("u1", "fact", false))
            .await
            .unwrap();
        assert_eq!(store.dimension().await.unwrap(), Some(2));

        let err = store
            .add("b", "text", vec![1.0, 0.0, 0.0], meta("u1", "fact", false))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));

        let err = store
            .query(&[1.0], 5, &RecordFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn test_update_metadata_merges() {
        let store = InMemoryVectorStore::new();
        store
            .add("a", "text", vec![1.0], meta("u1", "fact", false))
            .await
            .unwrap();

        let mut updates = MetadataMap::new();
        updates.insert("access_count".into(), MetadataValue::Int(7));
        assert!(store.update_metadata("a", updates).await.unwrap());

        let item = store.get_by_id("a").await.unwrap().unwrap();
        assert_eq!(
            item.metadata.get("access_count").and_then(|v| v.as_i64()),
            Some(7)
        );
        // Untouched keys survive the merge
        assert_eq!(
            item.metadata.get(KEY_USER_ID).and_then(|v| v.as_str()),
            Some("u1")
        );

        assert!(!store
            .update_metadata("missing", MetadataMap::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryVectorStore::new();
        store
            .add("a", "text", vec![1.0], meta("u1", "fact", false))
            .await
            .unwrap();
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_ordering_oldest_first() {
        let store = InMemoryVectorStore::new();
        let mut older = meta("u1", "fact", false);
        older.insert(
            KEY_CREATED_AT.into(),
            "2024-01-01T00:00:00+00:00".into(),
        );
        let mut newer = meta("u1", "fact", false);
        newer.insert(
            KEY_CREATED_AT.into(),
            "2025-01-01T00:00:00+00:00".into(),
        );

        store.add("z-old", "old", vec![1.0], older).await.unwrap();
        store.add("a-new", "new", vec![1.0], newer).await.unwrap();

        let items = store.get(&RecordFilter::for_user("u1"), 10).await.unwrap();
        assert_eq!(items[0].id, "z-old");
        assert_eq!(items[1].id, "a-new");
    }
}
