//! Shared test collaborators: a deterministic local embedder and a
//! scriptable completion stub, wired into an engine over the in-memory
//! vector store.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use memoir_engine::services::embedding::EmbeddingProvider;
use memoir_engine::services::llm::{CompletionOptions, CompletionProvider};
use memoir_engine::{EngineConfig, EngineError, EngineResult, InMemoryVectorStore, MemoryEngine};

/// Deterministic bag-of-words embedder: tokens hashed into a fixed-size
/// vector. Similar texts share buckets, so cosine ranking behaves sensibly
/// without any network dependency.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { dimension: 64 }
    }
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

/// Scriptable completion stub. Structured calls pop from a queue of
/// responses; plain completions return a fixed summary. `None` entries and
/// a missing summary simulate collaborator failure.
pub struct ScriptedCompletion {
    structured: Mutex<Vec<Option<serde_json::Value>>>,
    summary: Option<String>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self {
            structured: Mutex::new(Vec::new()),
            summary: None,
        }
    }

    /// Queue a structured response (popped front-first).
    pub fn push_structured(self, value: serde_json::Value) -> Self {
        self.structured.try_lock().unwrap().push(Some(value));
        self
    }

    /// Queue a malformed-output response.
    pub fn push_malformed(self) -> Self {
        self.structured.try_lock().unwrap().push(None);
        self
    }

    /// Fix the plain-completion (summarization) response.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> EngineResult<String> {
        match &self.summary {
            Some(text) => Ok(text.clone()),
            None => Err(EngineError::completion("completion service unavailable")),
        }
    }

    async fn complete_structured(
        &self,
        _prompt: &str,
    ) -> EngineResult<Option<serde_json::Value>> {
        let mut queue = self.structured.lock().await;
        if queue.is_empty() {
            Err(EngineError::completion("completion service unavailable"))
        } else {
            Ok(queue.remove(0))
        }
    }
}

/// Engine over the in-memory store with the given completion stub.
pub async fn engine_with(completion: ScriptedCompletion) -> MemoryEngine {
    MemoryEngine::connect(
        "test-user",
        EngineConfig::default(),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(HashEmbedder::new()),
        Arc::new(completion),
    )
    .await
    .expect("engine construction")
}

/// Engine whose completion collaborator always fails.
pub async fn engine() -> MemoryEngine {
    engine_with(ScriptedCompletion::new()).await
}
