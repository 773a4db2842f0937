//! Memory Store Facade
//!
//! User-scoped, typed access to the external vector store: stamps ids and
//! timestamps on insert, runs every record through the metadata codec, and
//! guards the embedding dimension against the store's existing contents.
//! All list-valued fields cross the scalar boundary through `store::codec`.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::models::memory::{MemoryRecord, MemoryType};
use crate::services::embedding::EmbeddingProvider;
use crate::services::store::codec::{
    self, KEY_ACCESS_COUNT, KEY_ARCHIVED, KEY_ARCHIVE_REASON, KEY_CONSOLIDATED_INTO,
    KEY_LAST_ACCESSED,
};
use crate::services::store::{MetadataMap, RecordFilter, VectorStore};
use crate::utils::error::{EngineError, EngineResult};

/// Typed facade over the vector store for one user's records.
pub struct MemoryStore {
    user_id: String,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MemoryStore {
    pub fn new(
        user_id: impl Into<String>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            vectors,
            embedder,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Fail loudly when the embedder's dimensionality no longer matches the
    /// vectors already stored — continuing would corrupt similarity
    /// semantics and requires a store migration instead.
    pub async fn verify_dimension(&self) -> EngineResult<()> {
        if let Some(stored) = self.vectors.dimension().await? {
            let configured = self.embedder.dimension();
            if stored != configured {
                return Err(EngineError::config(format!(
                    "embedding dimension mismatch: store holds {}-dimensional vectors but the embedder produces {}; migrate the store before continuing",
                    stored, configured
                )));
            }
        }
        Ok(())
    }

    /// Persist a record, embedding its content. Overwrites any record with
    /// the same id, so this doubles as the content-update path (the
    /// embedding is recomputed from the new content).
    pub async fn put(&self, record: &MemoryRecord) -> EngineResult<()> {
        let embedding = self.embedder.embed(&record.content).await?;
        let metadata = codec::record_to_metadata(record);
        self.vectors
            .add(&record.id, &record.content, embedding, metadata)
            .await?;
        debug!(id = %record.id, memory_type = %record.memory_type, "memory stored");
        Ok(())
    }

    /// Fetch one record by id.
    pub async fn get(&self, id: &str) -> EngineResult<Option<MemoryRecord>> {
        Ok(self
            .vectors
            .get_by_id(id)
            .await?
            .map(|item| codec::metadata_to_record(&item.id, &item.text, &item.metadata)))
    }

    /// Merge metadata keys into a stored record.
    pub async fn update_metadata(&self, id: &str, updates: MetadataMap) -> EngineResult<bool> {
        self.vectors.update_metadata(id, updates).await
    }

    /// Delete a record. Returns false when it did not exist.
    pub async fn delete(&self, id: &str) -> EngineResult<bool> {
        self.vectors.delete(id).await
    }

    /// All of this user's records, oldest first.
    pub async fn list(
        &self,
        include_archived: bool,
        limit: usize,
    ) -> EngineResult<Vec<MemoryRecord>> {
        let mut filter = RecordFilter::for_user(&self.user_id);
        filter.include_archived = include_archived;

        let items = self.vectors.get(&filter, limit).await?;
        Ok(items
            .iter()
            .map(|item| codec::metadata_to_record(&item.id, &item.text, &item.metadata))
            .collect())
    }

    /// Active records of one type, oldest first.
    pub async fn list_by_type(
        &self,
        memory_type: MemoryType,
        limit: usize,
    ) -> EngineResult<Vec<MemoryRecord>> {
        let filter = RecordFilter::for_user(&self.user_id).with_types(vec![memory_type]);
        let items = self.vectors.get(&filter, limit).await?;
        Ok(items
            .iter()
            .map(|item| codec::metadata_to_record(&item.id, &item.text, &item.metadata))
            .collect())
    }

    /// Similarity search over the user's active records.
    ///
    /// Returns records with the store-supplied similarity, ranked descending.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        types: Option<&[MemoryType]>,
    ) -> EngineResult<Vec<(MemoryRecord, f32)>> {
        let embedding = self.embedder.embed(query).await?;

        let mut filter = RecordFilter::for_user(&self.user_id);
        if let Some(types) = types {
            filter.memory_types = Some(types.to_vec());
        }

        let hits = self.vectors.query(&embedding, k, &filter).await?;
        Ok(hits
            .iter()
            .map(|hit| {
                (
                    codec::metadata_to_record(&hit.id, &hit.text, &hit.metadata),
                    hit.similarity,
                )
            })
            .collect())
    }

    /// Increment a record's access count and refresh its last-accessed time.
    pub async fn bump_access(&self, id: &str) -> EngineResult<bool> {
        let Some(record) = self.get(id).await? else {
            return Ok(false);
        };

        let mut updates = MetadataMap::new();
        updates.insert(KEY_ACCESS_COUNT.into(), (record.access_count + 1).into());
        updates.insert(KEY_LAST_ACCESSED.into(), Utc::now().to_rfc3339().into());
        self.vectors.update_metadata(id, updates).await
    }

    /// Soft-remove a record from retrieval while keeping it for audit.
    pub async fn archive(
        &self,
        id: &str,
        reason: &str,
        consolidated_into: Option<&str>,
    ) -> EngineResult<bool> {
        let mut updates = MetadataMap::new();
        updates.insert(KEY_ARCHIVED.into(), true.into());
        updates.insert(KEY_ARCHIVE_REASON.into(), reason.into());
        if let Some(into) = consolidated_into {
            updates.insert(KEY_CONSOLIDATED_INTO.into(), into.into());
        }
        self.vectors.update_metadata(id, updates).await
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::memory::SourceType;
    use crate::services::embedding::EmbeddingProvider;
    use crate::services::store::InMemoryVectorStore;
    use async_trait::async_trait;

    /// Deterministic embedder: hashes tokens into a small fixed-size vector.
    struct HashEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbedder {
        async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
            let mut v = vec![0.0f32; self.dimension];
            for token in text.to_lowercase().split_whitespace() {
                let mut h: usize = 5381;
                for b in token.bytes() {
                    h = h.wrapping_mul(33).wrapping_add(b as usize);
                }
                v[h % self.dimension] += 1.0;
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    fn test_store() -> MemoryStore {
        MemoryStore::new(
            "user-1",
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashEmbedder { dimension: 16 }),
        )
    }

    fn record(content: &str, mtype: MemoryType) -> MemoryRecord {
        MemoryRecord::new("user-1", content, mtype, 0.6, SourceType::Explicit)
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let store = test_store();
        let rec = record("I love hiking in the mountains", MemoryType::Preference);
        store.put(&rec).await.unwrap();

        let fetched = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "I love hiking in the mountains");
        assert_eq!(fetched.memory_type, MemoryType::Preference);
        assert_eq!(fetched.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_put_overwrites_same_id() {
        let store = test_store();
        let mut rec = record("original content", MemoryType::Fact);
        store.put(&rec).await.unwrap();

        rec.content = "rewritten content".to_string();
        store.put(&rec).await.unwrap();

        let fetched = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "rewritten content");
        assert_eq!(store.list(true, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_ranks_similar_first() {
        let store = test_store();
        store
            .put(&record("I love hiking in the mountains", MemoryType::Preference))
            .await
            .unwrap();
        store
            .put(&record("the invoice system uses cron", MemoryType::Fact))
            .await
            .unwrap();

        let results = store.search("hiking mountains", 10, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].0.content.contains("hiking"));
        assert!(results[0].1 >= results[1].1);
    }

    #[tokio::test]
    async fn test_search_with_type_filter() {
        let store = test_store();
        store
            .put(&record("I love tea", MemoryType::Preference))
            .await
            .unwrap();
        store
            .put(&record("tea contains caffeine", MemoryType::Fact))
            .await
            .unwrap();

        let results = store
            .search("tea", 10, Some(&[MemoryType::Fact]))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.memory_type, MemoryType::Fact);
    }

    #[tokio::test]
    async fn test_bump_access() {
        let store = test_store();
        let rec = record("some fact", MemoryType::Fact);
        store.put(&rec).await.unwrap();

        assert!(store.bump_access(&rec.id).await.unwrap());
        assert!(store.bump_access(&rec.id).await.unwrap());

        let fetched = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(fetched.access_count, 2);
        assert!(fetched.last_accessed.is_some());

        assert!(!store.bump_access("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_archive_excludes_from_active_lists() {
        let store = test_store();
        let rec = record("stale memory", MemoryType::Conversation);
        store.put(&rec).await.unwrap();

        assert!(store
            .archive(&rec.id, "temporal_decay", None)
            .await
            .unwrap());

        assert!(store.list(false, 100).await.unwrap().is_empty());
        let all = store.list(true, 100).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].archived);
        assert_eq!(all[0].archive_reason.as_deref(), Some("temporal_decay"));
    }

    #[tokio::test]
    async fn test_verify_dimension_mismatch_is_loud() {
        let vectors: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let store = MemoryStore::new(
            "user-1",
            vectors.clone(),
            Arc::new(HashEmbedder { dimension: 16 }),
        );
        store
            .put(&record("seed", MemoryType::Fact))
            .await
            .unwrap();

        // Same store, differently-sized embedder: must refuse.
        let misconfigured =
            MemoryStore::new("user-1", vectors, Arc::new(HashEmbedder { dimension: 8 }));
        let err = misconfigured.verify_dimension().await.unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn test_verify_dimension_empty_store_ok() {
        let store = test_store();
        assert!(store.verify_dimension().await.is_ok());
    }

    #[tokio::test]
    async fn test_list_by_type() {
        let store = test_store();
        store
            .put(&record("I love tea", MemoryType::Preference))
            .await
            .unwrap();
        store
            .put(&record("water boils at 100 degrees", MemoryType::Fact))
            .await
            .unwrap();

        let prefs = store
            .list_by_type(MemoryType::Preference, 100)
            .await
            .unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].memory_type, MemoryType::Preference);
    }
}
