//! Lifecycle Maintenance
//!
//! Per-user batch job over the full record set: importance refresh with
//! temporal decay, clustering-based consolidation, and expiration/archival.
//! The run is cancellable between records — every record update is
//! self-contained and recomputed from timestamps, so an aborted run leaves
//! nothing corrupt and the next run picks up where this one stopped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::LifecycleConfig;
use crate::models::memory::{MemoryRecord, MemoryType, SourceType};
use crate::models::report::{HealthReport, HealthStatus, MaintenanceReport};
use crate::services::llm::{CompletionOptions, CompletionProvider};
use crate::services::memory::decay::{access_boost, decay_strength};
use crate::services::memory::store::MemoryStore;
use crate::services::store::codec::{
    KEY_DECAY_STRENGTH, KEY_IMPORTANCE, KEY_LAST_MAINTENANCE,
};
use crate::services::store::MetadataMap;
use crate::utils::error::EngineResult;
use crate::utils::text::jaccard_similarity;

/// Archive reason written on expiration.
const REASON_TEMPORAL_DECAY: &str = "temporal_decay";

/// Archive reason written on consolidation.
const REASON_CONSOLIDATED: &str = "consolidated";

/// Characters of the consolidated content kept as a back-reference on the
/// archived originals.
const BACK_REFERENCE_CHARS: usize = 100;

/// Importance multiplier per type for maintenance refresh. Distinct from the
/// retrieval type weight: this one rewards longevity, not query relevance.
pub fn type_multiplier(memory_type: MemoryType) -> f32 {
    match memory_type {
        MemoryType::CoreIdentity => 1.5,
        MemoryType::Preference => 1.3,
        MemoryType::Fact => 1.2,
        MemoryType::Procedural => 1.1,
        MemoryType::Episodic => 0.9,
        MemoryType::Temporal => 0.8,
        MemoryType::Conversation => 0.7,
    }
}

/// Greedy single-link clustering over record contents.
///
/// Each unprocessed record seeds a cluster and pulls in every later record
/// whose token-set Jaccard similarity against the seed meets the threshold.
/// Returns index clusters of size >= `min_size`.
pub fn find_clusters(
    records: &[MemoryRecord],
    threshold: f32,
    min_size: usize,
) -> Vec<Vec<usize>> {
    let mut clusters = Vec::new();
    let mut processed = vec![false; records.len()];

    for i in 0..records.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;
        let mut cluster = vec![i];

        for j in (i + 1)..records.len() {
            if processed[j] {
                continue;
            }
            if jaccard_similarity(&records[i].content, &records[j].content) >= threshold {
                cluster.push(j);
                processed[j] = true;
            }
        }

        if cluster.len() >= min_size {
            clusters.push(cluster);
        }
    }

    clusters
}

/// Summarization prompt for one cluster.
pub fn build_consolidation_prompt(contents: &[&str]) -> String {
    let listing = contents
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Consolidate these related memories into a single, comprehensive memory:

Memories to consolidate:
{listing}

Create a concise summary that captures the essential information from all memories.
Return only the consolidated text, no explanations."#,
    )
}

/// Lifecycle maintenance over one user's records.
pub struct MemoryMaintenance<'a> {
    config: &'a LifecycleConfig,
    store: &'a MemoryStore,
    completion: &'a dyn CompletionProvider,
}

impl<'a> MemoryMaintenance<'a> {
    pub fn new(
        config: &'a LifecycleConfig,
        store: &'a MemoryStore,
        completion: &'a dyn CompletionProvider,
    ) -> Self {
        Self {
            config,
            store,
            completion,
        }
    }

    /// Run the full maintenance pass: importance refresh, consolidation,
    /// expiration. Aborts between records when `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) -> EngineResult<MaintenanceReport> {
        let now = Utc::now();
        let mut report = MaintenanceReport::default();

        let records = self.store.list(true, self.config.batch_limit).await?;
        report.total_records = records.len();

        report.importance_updates = self.refresh_importance(&records, now, cancel).await?;
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let (clusters, consolidated, archived_by_consolidation) =
            self.consolidate(cancel).await?;
        report.clusters_found = clusters;
        report.consolidated = consolidated;
        report.archived += archived_by_consolidation;
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let (expired, archived_by_expiry) = self.expire(cancel).await?;
        report.expired = expired;
        report.archived += archived_by_expiry;
        report.cancelled = cancel.is_cancelled();

        info!(
            total = report.total_records,
            refreshed = report.importance_updates,
            consolidated = report.consolidated,
            archived = report.archived,
            expired = report.expired,
            "maintenance run finished"
        );
        Ok(report)
    }

    /// Phase 1: `new_importance = old * decay * access_boost * type_multiplier`,
    /// clamped to [0,1]; persists importance, decay strength and the
    /// maintenance timestamp.
    async fn refresh_importance(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> EngineResult<usize> {
        let mut updated = 0;

        for record in records {
            if cancel.is_cancelled() {
                break;
            }

            let decay = decay_strength(record.created_at, record.memory_type, now);
            let boost = access_boost(record.access_count);
            let multiplier = type_multiplier(record.memory_type);
            let new_importance =
                (record.importance * decay * boost * multiplier).clamp(0.0, 1.0);

            let mut updates = MetadataMap::new();
            updates.insert(KEY_IMPORTANCE.into(), new_importance.into());
            updates.insert(KEY_DECAY_STRENGTH.into(), decay.into());
            updates.insert(KEY_LAST_MAINTENANCE.into(), now.to_rfc3339().into());

            if self.store.update_metadata(&record.id, updates).await? {
                updated += 1;
            }
        }

        Ok(updated)
    }

    /// Phase 2: cluster active records per type and fold each cluster into a
    /// summarized record, archiving the originals.
    async fn consolidate(
        &self,
        cancel: &CancellationToken,
    ) -> EngineResult<(usize, usize, usize)> {
        let active = self.store.list(false, self.config.batch_limit).await?;

        let mut by_type: HashMap<MemoryType, Vec<MemoryRecord>> = HashMap::new();
        for record in active {
            by_type.entry(record.memory_type).or_default().push(record);
        }

        let mut clusters_found = 0;
        let mut consolidated = 0;
        let mut archived = 0;

        // Deterministic order across runs.
        let mut types: Vec<MemoryType> = by_type.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());

        for memory_type in types {
            let group = &by_type[&memory_type];
            if group.len() < self.config.min_cluster_size {
                continue;
            }

            let clusters = find_clusters(
                group,
                self.config.cluster_similarity_threshold,
                self.config.min_cluster_size,
            );

            for cluster in clusters {
                clusters_found += 1;
                if cancel.is_cancelled() {
                    return Ok((clusters_found, consolidated, archived));
                }

                let members: Vec<&MemoryRecord> = cluster.iter().map(|&i| &group[i]).collect();
                match self.consolidate_cluster(memory_type, &members).await? {
                    Some(archived_count) => {
                        consolidated += members.len();
                        archived += archived_count;
                    }
                    None => continue,
                }
            }
        }

        Ok((clusters_found, consolidated, archived))
    }

    /// Summarize one cluster into a new record and archive the originals.
    /// Returns None when the summary was unusable and the cluster was left
    /// untouched.
    async fn consolidate_cluster(
        &self,
        memory_type: MemoryType,
        members: &[&MemoryRecord],
    ) -> EngineResult<Option<usize>> {
        let contents: Vec<&str> = members.iter().map(|m| m.content.as_str()).collect();
        let prompt = build_consolidation_prompt(&contents);

        let summary = match self
            .completion
            .complete(&prompt, &CompletionOptions::default())
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "consolidation summary failed, cluster left untouched");
                return Ok(None);
            }
        };

        if summary.len() < self.config.min_summary_chars {
            warn!(len = summary.len(), "degenerate consolidation summary, cluster skipped");
            return Ok(None);
        }

        let max_importance = members
            .iter()
            .map(|m| m.importance)
            .fold(0.0f32, f32::max);
        let importance = (max_importance * self.config.consolidation_boost).min(1.0);

        let mut record = MemoryRecord::new(
            self.store.user_id(),
            summary.clone(),
            memory_type,
            importance,
            SourceType::Inferred,
        );
        record.consolidated_from = members.iter().map(|m| m.id.clone()).collect();
        self.store.put(&record).await?;

        let back_reference: String = summary.chars().take(BACK_REFERENCE_CHARS).collect();
        let mut archived = 0;
        for member in members {
            if self
                .store
                .archive(&member.id, REASON_CONSOLIDATED, Some(&back_reference))
                .await?
            {
                archived += 1;
            }
        }

        Ok(Some(archived))
    }

    /// Phase 3: archive or delete active records whose decay strength fell
    /// below the expiration threshold. High-value records and the
    /// core-identity/preference types are archived, never silently lost.
    async fn expire(&self, cancel: &CancellationToken) -> EngineResult<(usize, usize)> {
        let active = self.store.list(false, self.config.batch_limit).await?;

        let mut expired = 0;
        let mut archived = 0;

        for record in active {
            if cancel.is_cancelled() {
                break;
            }
            if record.decay_strength >= self.config.expiration_threshold {
                continue;
            }

            let keep = record.importance > self.config.archive_importance_threshold
                || matches!(
                    record.memory_type,
                    MemoryType::CoreIdentity | MemoryType::Preference
                );

            if keep {
                if self
                    .store
                    .archive(&record.id, REASON_TEMPORAL_DECAY, None)
                    .await?
                {
                    archived += 1;
                }
            } else if self.store.delete(&record.id).await? {
                expired += 1;
            }
        }

        Ok((expired, archived))
    }

    /// Health metrics over all of the user's records.
    pub async fn health(&self) -> EngineResult<HealthReport> {
        let records = self.store.list(true, self.config.batch_limit).await?;

        let total = records.len();
        let active = records.iter().filter(|r| !r.archived).count();

        let mut type_distribution: HashMap<String, usize> = HashMap::new();
        for record in &records {
            *type_distribution
                .entry(record.memory_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let (avg_importance, avg_decay_strength) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                records.iter().map(|r| r.importance).sum::<f32>() / total as f32,
                records.iter().map(|r| r.decay_strength).sum::<f32>() / total as f32,
            )
        };

        let ratio = if total == 0 {
            0.0
        } else {
            active as f32 / total as f32
        };
        let health_score =
            ((ratio * 40.0 + avg_importance * 30.0 + avg_decay_strength * 30.0) as u8).min(100);

        Ok(HealthReport {
            total_memories: total,
            active_memories: active,
            archived_memories: total - active,
            recommendations: health_recommendations(health_score, &type_distribution),
            type_distribution,
            avg_importance,
            avg_decay_strength,
            health_score,
            status: HealthStatus::from_score(health_score),
        })
    }
}

/// Actionable recommendations from the score and type mix.
fn health_recommendations(
    score: u8,
    type_distribution: &HashMap<String, usize>,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    let count = |t: MemoryType| type_distribution.get(t.as_str()).copied().unwrap_or(0);

    if score < 60 {
        recommendations
            .push("Consider running memory consolidation to improve organization".to_string());
    }
    if count(MemoryType::Conversation) > count(MemoryType::Fact) {
        recommendations.push(
            "Focus on extracting more factual information from conversations".to_string(),
        );
    }
    if count(MemoryType::CoreIdentity) < 2 {
        recommendations
            .push("Build more core identity memories for better personalization".to_string());
    }

    recommendations
}
