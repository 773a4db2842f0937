//! Memory Engine Facade
//!
//! The caller-facing interface consumed by the conversation agent. One
//! engine instance serves one user and explicitly owns its collaborators —
//! vector store, embedder, completion service — behind `Arc`s; there is no
//! module-level state. Every entry point returns `EngineResult` and never
//! panics; upstream failures degrade to the documented fallbacks.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::models::context::ConversationContext;
use crate::models::memory::{CandidateMemory, MemoryRecord, MemoryType, SourceType};
use crate::models::report::{
    CommitOutcome, ExtractionReport, HealthReport, MaintenanceReport, RetrievalInsights,
    ScoredMemory,
};
use crate::services::embedding::EmbeddingProvider;
use crate::services::llm::CompletionProvider;
use crate::services::memory::classify::{KeywordIntelligence, MemoryIntelligence};
use crate::services::memory::conflict::{ConflictResolver, MemoryOperation};
use crate::services::memory::contextual::ContextualRanker;
use crate::services::memory::extraction::ExtractionPipeline;
use crate::services::memory::maintenance::MemoryMaintenance;
use crate::services::memory::retrieval::{self, RetrievalRequest};
use crate::services::memory::store::MemoryStore;
use crate::utils::error::EngineResult;

/// Per-user memory engine.
pub struct MemoryEngine {
    config: EngineConfig,
    store: MemoryStore,
    completion: Arc<dyn CompletionProvider>,
    intelligence: Arc<dyn MemoryIntelligence>,
    resolver: ConflictResolver,
    ranker: ContextualRanker,
}

impl MemoryEngine {
    /// Build an engine for one user over the given collaborators.
    ///
    /// Validates the configuration and the embedding dimension against the
    /// store's existing contents; a mismatch is a loud configuration error.
    pub async fn connect(
        user_id: impl Into<String>,
        config: EngineConfig,
        vectors: Arc<dyn crate::services::store::VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let store = MemoryStore::new(user_id, vectors, embedder);
        store.verify_dimension().await?;

        let resolver = ConflictResolver::new(config.conflict.clone());
        let ranker = ContextualRanker::new(config.contextual.clone());

        Ok(Self {
            config,
            store,
            completion,
            intelligence: Arc::new(KeywordIntelligence),
            resolver,
            ranker,
        })
    }

    /// Swap the classification strategy (defaults to the keyword heuristic).
    pub fn with_intelligence(mut self, intelligence: Arc<dyn MemoryIntelligence>) -> Self {
        self.intelligence = intelligence;
        self
    }

    pub fn user_id(&self) -> &str {
        self.store.user_id()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Multi-factor retrieval: relevance-scored top-k for a query.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        type_filter: Option<Vec<MemoryType>>,
    ) -> EngineResult<Vec<ScoredMemory>> {
        let mut request = RetrievalRequest::new(query, k)
            .with_min_relevance(self.config.retrieval.min_relevance);
        if let Some(types) = type_filter {
            request = request.with_types(types);
        }

        retrieval::search_memories(&self.store, &self.config.retrieval, &request, Utc::now()).await
    }

    /// Context-aware retrieval: base relevance blended with conversation
    /// state, selected for type diversity.
    pub async fn retrieve_contextual(
        &self,
        query: &str,
        context: &ConversationContext,
        k: usize,
    ) -> EngineResult<(Vec<ScoredMemory>, RetrievalInsights)> {
        // Over-fetch the base pass so diversity selection has material.
        let request = RetrievalRequest::new(query, k.saturating_mul(2).max(1))
            .with_min_relevance(self.config.retrieval.min_relevance);
        let base = retrieval::search_memories(
            &self.store,
            &self.config.retrieval,
            &request,
            Utc::now(),
        )
        .await?;
        let candidates = base.len();

        let ranked = self.ranker.rank(base, context, Utc::now());
        let selected = self.ranker.select(ranked, k);
        let insights = self.ranker.insights(candidates, &selected, context);

        Ok((selected, insights))
    }

    /// Push one conversation turn through the extraction pipeline.
    pub async fn record_turn(
        &self,
        user_text: &str,
        assistant_text: &str,
    ) -> EngineResult<ExtractionReport> {
        let pipeline = ExtractionPipeline::new(
            &self.config.extraction,
            self.intelligence.as_ref(),
            &self.resolver,
        );
        pipeline
            .record_turn(&self.store, self.completion.as_ref(), user_text, assistant_text)
            .await
    }

    /// Directly insert a memory, classified and conflict-resolved the same
    /// way extracted candidates are. `user_explicit` marks content the user
    /// asked to be remembered verbatim.
    pub async fn remember(
        &self,
        content: &str,
        user_explicit: bool,
    ) -> EngineResult<CommitOutcome> {
        let memory_type = self.intelligence.classify(content);
        let importance = self.intelligence.score_importance(content, user_explicit);
        let candidate = CandidateMemory::new(
            content,
            memory_type,
            importance,
            SourceType::Explicit,
        );

        let existing = self.store.list_by_type(memory_type, 50).await?;
        let outcome = match self.resolver.resolve(&candidate, &existing) {
            MemoryOperation::Add => {
                let record = MemoryRecord::new(
                    self.store.user_id(),
                    content,
                    memory_type,
                    importance,
                    SourceType::Explicit,
                );
                self.store.put(&record).await?;
                CommitOutcome::Added {
                    id: record.id,
                    content: content.to_string(),
                }
            }
            MemoryOperation::Update { target_id, reason } => {
                match self.store.get(&target_id).await? {
                    Some(mut record) => {
                        record.content = content.to_string();
                        record.importance = record.importance.max(importance);
                        record.updated_at = Some(Utc::now());
                        record.clamp_scores();
                        self.store.put(&record).await?;
                        CommitOutcome::Updated {
                            id: target_id,
                            content: content.to_string(),
                            reason,
                        }
                    }
                    None => {
                        let record = MemoryRecord::new(
                            self.store.user_id(),
                            content,
                            memory_type,
                            importance,
                            SourceType::Explicit,
                        );
                        self.store.put(&record).await?;
                        CommitOutcome::Added {
                            id: record.id,
                            content: content.to_string(),
                        }
                    }
                }
            }
            MemoryOperation::Supersede { target_id, .. } => {
                self.store.delete(&target_id).await?;
                let record = MemoryRecord::new(
                    self.store.user_id(),
                    content,
                    memory_type,
                    importance,
                    SourceType::Explicit,
                );
                self.store.put(&record).await?;
                CommitOutcome::Superseded {
                    deleted_id: target_id,
                    new_id: record.id,
                    content: content.to_string(),
                }
            }
            MemoryOperation::Skip { reason } => CommitOutcome::Skipped {
                content: content.to_string(),
                reason: reason.as_str().to_string(),
            },
        };

        Ok(outcome)
    }

    /// Run the lifecycle batch job; abortable between records.
    pub async fn run_maintenance(
        &self,
        cancel: &CancellationToken,
    ) -> EngineResult<MaintenanceReport> {
        let maintenance = MemoryMaintenance::new(
            &self.config.lifecycle,
            &self.store,
            self.completion.as_ref(),
        );
        maintenance.run(cancel).await
    }

    /// Health metrics for this user's memory set.
    pub async fn health(&self) -> EngineResult<HealthReport> {
        let maintenance = MemoryMaintenance::new(
            &self.config.lifecycle,
            &self.store,
            self.completion.as_ref(),
        );
        maintenance.health().await
    }

    /// Direct access to the typed store facade, for callers that need raw
    /// record CRUD (deletion, listing, audit).
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("user_id", &self.store.user_id())
            .finish()
    }
}
