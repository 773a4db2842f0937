//! End-to-end lifecycle behavior: maintenance (importance refresh,
//! consolidation, expiration), cancellation, and health reporting.

mod support;

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use memoir_engine::{
    ConversationContext, EngineConfig, HealthStatus, InMemoryVectorStore, MemoryEngine, MemoryType,
};
use support::{engine_with, HashEmbedder, ScriptedCompletion};

#[tokio::test]
async fn maintenance_consolidates_five_near_duplicates() {
    let completion = ScriptedCompletion::new()
        .with_summary("The second-floor printer jams every Monday morning.");
    let engine = engine_with(completion).await;

    for suffix in ["", " sadly", " again", " still", " often"] {
        engine
            .remember(
                &format!("the printer on floor two jams every monday{}", suffix),
                true,
            )
            .await
            .unwrap();
    }
    let before_active = engine.store().list(false, 100).await.unwrap().len();
    assert_eq!(before_active, 5);

    let report = engine
        .run_maintenance(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.clusters_found, 1);
    assert_eq!(report.consolidated, 5);
    assert_eq!(report.archived, 5);
    assert!(!report.cancelled);

    // One consolidated cluster of five: active count shrank by size - 1.
    let active = engine.store().list(false, 100).await.unwrap();
    assert_eq!(active.len(), before_active - 4);

    // No content lost: originals archived and traceable via lineage.
    let summary = &active[0];
    assert_eq!(summary.consolidated_from.len(), 5);
    let all = engine.store().list(true, 100).await.unwrap();
    assert_eq!(all.len(), 6);
    for record in all.iter().filter(|r| r.archived) {
        assert!(summary.consolidated_from.contains(&record.id));
        assert!(record.consolidated_into.is_some());
    }
}

#[tokio::test]
async fn maintenance_skips_consolidation_when_summarizer_down() {
    // No summary configured: the completion collaborator fails, clusters are
    // found but left untouched.
    let engine = engine_with(ScriptedCompletion::new()).await;

    for suffix in ["", " sadly", " again"] {
        engine
            .remember(
                &format!("the printer on floor two jams every monday{}", suffix),
                true,
            )
            .await
            .unwrap();
    }

    let report = engine
        .run_maintenance(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.clusters_found, 1);
    assert_eq!(report.consolidated, 0);
    assert_eq!(engine.store().list(false, 100).await.unwrap().len(), 3);
}

#[tokio::test]
async fn maintenance_refreshes_decay_and_importance() {
    let engine = engine_with(ScriptedCompletion::new()).await;
    engine.remember("I am a marine biologist", true).await.unwrap();

    let report = engine
        .run_maintenance(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.total_records, 1);
    assert_eq!(report.importance_updates, 1);

    let records = engine.store().list(true, 100).await.unwrap();
    let record = &records[0];
    // Fresh record: decay ~1.0, bounded fields intact.
    assert!(record.decay_strength > 0.99 && record.decay_strength <= 1.0);
    assert!(record.importance >= 0.0 && record.importance <= 1.0);
}

#[tokio::test]
async fn cancelled_maintenance_leaves_store_intact() {
    let engine = engine_with(ScriptedCompletion::new()).await;
    for i in 0..4 {
        engine
            .remember(&format!("note number {} about the garden", i), true)
            .await
            .unwrap();
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = engine.run_maintenance(&cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.importance_updates, 0);
    assert_eq!(report.consolidated, 0);
    assert_eq!(report.expired, 0);
    assert_eq!(engine.store().list(true, 100).await.unwrap().len(), 4);

    // A later uncancelled run completes normally over the same records.
    let report = engine
        .run_maintenance(&CancellationToken::new())
        .await
        .unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.importance_updates, 4);
}

#[tokio::test]
async fn health_reports_score_status_and_recommendations() {
    let engine = engine_with(ScriptedCompletion::new()).await;
    engine.remember("I am a teacher in Lyon", true).await.unwrap();
    engine.remember("I prefer morning meetings", true).await.unwrap();

    let health = engine.health().await.unwrap();
    assert_eq!(health.total_memories, 2);
    assert_eq!(health.active_memories, 2);
    assert_eq!(health.archived_memories, 0);
    assert!(health.health_score <= 100);
    assert_eq!(health.status, HealthStatus::from_score(health.health_score));
    // Fewer than two core-identity records: the recommendation fires.
    assert!(health
        .recommendations
        .iter()
        .any(|r| r.contains("core identity")));
}

#[tokio::test]
async fn health_empty_user_is_poor_not_an_error() {
    let engine = engine_with(ScriptedCompletion::new()).await;
    let health = engine.health().await.unwrap();
    assert_eq!(health.total_memories, 0);
    assert_eq!(health.health_score, 0);
    assert_eq!(health.status, HealthStatus::Poor);
}

#[tokio::test]
async fn full_session_workflow() {
    // A conversation happens, memories are extracted, retrieved with
    // context, and maintenance leaves the set healthy.
    let completion = ScriptedCompletion::new()
        .push_structured(json!({
            "facts": ["my name is Robin", "lives near the harbor"],
            "preferences": ["i prefer cycling over driving"],
            "entities": ["Robin"],
            "importance_score": 0.8,
            "confidence": 1.0
        }))
        .with_summary("unused");
    let engine = engine_with(completion).await;

    let report = engine
        .record_turn(
            "Hi, I'm Robin. I live near the harbor and cycle everywhere",
            "Good to know, Robin!",
        )
        .await
        .unwrap();
    assert_eq!(report.committed(), 3);

    let mut context = ConversationContext::new();
    context.add_exchange("I love talking about my hobby", "which is cycling");

    let (selected, insights) = engine
        .retrieve_contextual("cycling harbor", &context, 5)
        .await
        .unwrap();
    assert!(!selected.is_empty());
    assert!(selected.len() <= 5);
    assert_eq!(insights.current_topic.as_deref(), Some("personal"));

    let maintenance = engine
        .run_maintenance(&CancellationToken::new())
        .await
        .unwrap();
    assert!(maintenance.total_records >= 4);
    assert_eq!(maintenance.expired, 0);

    let health = engine.health().await.unwrap();
    assert!(health.total_memories >= 4);
}

#[tokio::test]
async fn engines_for_different_users_are_isolated() {
    // Two engines sharing one physical store must not see each other's
    // records.
    let vectors = Arc::new(InMemoryVectorStore::new());

    let engine_a = MemoryEngine::connect(
        "user-a",
        EngineConfig::default(),
        vectors.clone(),
        Arc::new(HashEmbedder::new()),
        Arc::new(ScriptedCompletion::new()),
    )
    .await
    .unwrap();
    let engine_b = MemoryEngine::connect(
        "user-b",
        EngineConfig::default(),
        vectors,
        Arc::new(HashEmbedder::new()),
        Arc::new(ScriptedCompletion::new()),
    )
    .await
    .unwrap();

    engine_a.remember("I am a violinist", true).await.unwrap();
    engine_b.remember("I am a drummer", true).await.unwrap();

    let a_records = engine_a.store().list(true, 100).await.unwrap();
    assert_eq!(a_records.len(), 1);
    assert!(a_records[0].content.contains("violinist"));

    let results = engine_b
        .retrieve("violinist", 5, Some(vec![MemoryType::CoreIdentity]))
        .await
        .unwrap();
    assert!(results.iter().all(|m| !m.record.content.contains("violinist")));
}
