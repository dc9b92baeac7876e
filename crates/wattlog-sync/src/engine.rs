//! The sync orchestrator: one triggerable cycle over the three tables.

use crate::resolver::RegistryResolver;
use crate::writer::{DedupWriter, StageStats};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use wattlog_config::{AppConfig, SyncConfig};
use wattlog_source::{
    fetch_access_rows, fetch_registry_entries, fetch_telemetry_rows, TabularSource,
};
use wattlog_store::Store;

/// Stages of a cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStage {
    SyncRegistry,
    SyncAccessEvents,
    SyncTelemetry,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncRegistry => "SYNC_REGISTRY",
            Self::SyncAccessEvents => "SYNC_ACCESS_EVENTS",
            Self::SyncTelemetry => "SYNC_TELEMETRY",
        }
    }
}

/// Outcome of one stage. `completed` is false only when the stage itself
/// failed (e.g. the watermark query errored) — per-row failures are inside
/// `stats` and still count as a completed stage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageOutcome {
    pub completed: bool,
    pub stats: StageStats,
}

/// What a full cycle did, for the trigger response and the logs.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub registry: StageOutcome,
    pub access_events: StageOutcome,
    pub telemetry: StageOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// Total rows written across all stages.
    pub fn total_written(&self) -> usize {
        self.registry.stats.written
            + self.access_events.stats.written
            + self.telemetry.stats.written
    }
}

/// Drives registry → access-event → telemetry sync, one cycle per call.
///
/// The engine holds no state across cycles besides the store handle; it is
/// safe to drop and rebuild between ticks. It does not schedule itself —
/// cycles are triggered externally (HTTP trigger or one-shot run).
pub struct SyncEngine {
    store: Store,
    source: Arc<dyn TabularSource>,
    sync_config: SyncConfig,
    fetch_limit: usize,
}

impl SyncEngine {
    pub fn new(store: Store, source: Arc<dyn TabularSource>, config: &AppConfig) -> Self {
        Self {
            store,
            source,
            sync_config: config.sync.clone(),
            fetch_limit: config.source.fetch_limit,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one full cycle. Stage failures are isolated: a broken whitelist
    /// fetch must not prevent telemetry sync, so every stage runs and the
    /// report records what each one managed.
    pub async fn run_cycle(&self) -> SyncReport {
        let started_at = Utc::now();
        tracing::info!("sync cycle started");

        let registry = self.run_stage(SyncStage::SyncRegistry, self.sync_registry().await);
        let access_events =
            self.run_stage(SyncStage::SyncAccessEvents, self.sync_access_events().await);
        let telemetry = self.run_stage(SyncStage::SyncTelemetry, self.sync_telemetry().await);

        let report = SyncReport {
            registry,
            access_events,
            telemetry,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            written = report.total_written(),
            "sync cycle finished"
        );
        report
    }

    fn run_stage(&self, stage: SyncStage, result: Result<StageStats>) -> StageOutcome {
        match result {
            Ok(stats) => {
                tracing::info!(
                    stage = stage.as_str(),
                    fetched = stats.fetched,
                    written = stats.written,
                    skipped_watermark = stats.skipped_watermark,
                    skipped_duplicate = stats.skipped_duplicate,
                    failed = stats.failed,
                    "stage completed"
                );
                StageOutcome {
                    completed: true,
                    stats,
                }
            }
            Err(e) => {
                tracing::error!(stage = stage.as_str(), error = %e, "stage failed");
                StageOutcome::default()
            }
        }
    }

    async fn sync_registry(&self) -> Result<StageStats> {
        let entries = fetch_registry_entries(self.source.as_ref()).await;
        let writer = DedupWriter::new(&self.store, &self.sync_config);
        Ok(writer.write_registry(&entries))
    }

    async fn sync_access_events(&self) -> Result<StageStats> {
        let rows = fetch_access_rows(self.source.as_ref(), self.fetch_limit).await;
        let writer = DedupWriter::new(&self.store, &self.sync_config);
        let mut resolver = RegistryResolver::new(&self.store);
        Ok(writer.write_access_events(&rows, &mut resolver)?)
    }

    async fn sync_telemetry(&self) -> Result<StageStats> {
        let rows = fetch_telemetry_rows(self.source.as_ref(), self.fetch_limit).await;
        let writer = DedupWriter::new(&self.store, &self.sync_config);
        Ok(writer.write_telemetry(&rows)?)
    }
}
