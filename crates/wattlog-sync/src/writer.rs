//! The deduplicating writer: candidates in, idempotent store writes out.
//!
//! Two layers of protection against double inserts:
//!
//! 1. a watermark pre-filter — candidates at or before the most recent
//!    persisted instant for the record kind are discarded without touching
//!    the historical window;
//! 2. a ±window existence check on the natural key (badge+time for events,
//!    device+time for telemetry) for whatever survives the watermark. The
//!    window absorbs the sub-second drift repeated reads of the same
//!    logical row can carry; the watermark alone cannot catch out-of-order
//!    or near-duplicate rows within one tick.
//!
//! Per-record failures are logged with the record's natural key and never
//! abort the batch.

use crate::resolver::RegistryResolver;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use wattlog_config::SyncConfig;
use wattlog_model::types::epoch_ms;
use wattlog_model::{
    parse_source_timestamp, AccessEvent, RegistryEntry, SessionStatus, TelemetrySample,
    UNKNOWN_BADGE_NAME,
};
use wattlog_source::{RawAccessRow, RawTelemetryRow};
use wattlog_store::Store;

/// What one stage did with its batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub fetched: usize,
    pub written: usize,
    pub skipped_watermark: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
}

/// Writes candidate batches into the store under the dedup contract.
pub struct DedupWriter<'a> {
    store: &'a Store,
    access_window_ms: i64,
    telemetry_window_ms: i64,
}

impl<'a> DedupWriter<'a> {
    pub fn new(store: &'a Store, config: &SyncConfig) -> Self {
        Self {
            store,
            access_window_ms: config.access_window_ms,
            telemetry_window_ms: config.telemetry_window_ms,
        }
    }

    /// Upsert registry candidates, last write wins per badge id.
    pub fn write_registry(&self, entries: &[RegistryEntry]) -> StageStats {
        let mut stats = StageStats {
            fetched: entries.len(),
            ..StageStats::default()
        };
        for entry in entries {
            match self.store.registry_upsert(entry) {
                Ok(()) => stats.written += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(badge_id = %entry.badge_id, error = %e, "registry upsert failed");
                }
            }
        }
        stats
    }

    /// Insert access-event candidates that survive the watermark and the
    /// ±window check, resolving each badge against the registry.
    pub fn write_access_events(
        &self,
        rows: &[RawAccessRow],
        resolver: &mut RegistryResolver<'_>,
    ) -> wattlog_store::Result<StageStats> {
        let watermark = self.store.access_event_latest_ms()?;
        let mut stats = StageStats {
            fetched: rows.len(),
            ..StageStats::default()
        };

        for row in rows {
            let occurred_at = normalize_or_now(&row.timestamp);
            let ts_ms = epoch_ms(occurred_at);
            if watermark.is_some_and(|w| ts_ms <= w) {
                stats.skipped_watermark += 1;
                continue;
            }

            match self.write_one_access(row, occurred_at, ts_ms, resolver) {
                Ok(true) => stats.written += 1,
                Ok(false) => stats.skipped_duplicate += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        badge_id = %row.badge_id,
                        timestamp = %row.timestamp,
                        error = %e,
                        "access event write failed"
                    );
                }
            }
        }
        Ok(stats)
    }

    fn write_one_access(
        &self,
        row: &RawAccessRow,
        occurred_at: NaiveDateTime,
        ts_ms: i64,
        resolver: &mut RegistryResolver<'_>,
    ) -> wattlog_store::Result<bool> {
        let registered = resolver.resolve(&row.badge_id)?;

        if self
            .store
            .access_event_exists_near(&row.badge_id, ts_ms, self.access_window_ms)?
        {
            return Ok(false);
        }

        // Unregistered badges are denied no matter what the device reported.
        let (resolved_user_name, session_status) = match registered {
            Some(entry) => {
                let name = row
                    .reported_user_name
                    .clone()
                    .unwrap_or_else(|| entry.name.clone());
                let status = SessionStatus::parse(&row.reported_status).unwrap_or_else(|| {
                    tracing::warn!(
                        badge_id = %row.badge_id,
                        status = %row.reported_status,
                        "unrecognized session status token"
                    );
                    SessionStatus::Disconnected
                });
                (Some(name), status)
            }
            None => (
                Some(UNKNOWN_BADGE_NAME.to_string()),
                SessionStatus::Denied,
            ),
        };

        self.store.access_event_insert(&AccessEvent {
            sequence_number: row.sequence_number,
            occurred_at,
            device_id: row.device_id.clone(),
            session_start: row.session_start.clone(),
            session_end: row.session_end.clone(),
            badge_id: row.badge_id.clone(),
            resolved_user_name,
            session_status,
            duration: row.duration.clone(),
        })?;
        Ok(true)
    }

    /// Insert telemetry candidates that survive the watermark and the
    /// ±window check on (device, time).
    pub fn write_telemetry(
        &self,
        rows: &[RawTelemetryRow],
    ) -> wattlog_store::Result<StageStats> {
        let watermark = self.store.telemetry_latest_ms()?;
        let mut stats = StageStats {
            fetched: rows.len(),
            ..StageStats::default()
        };

        for row in rows {
            let occurred_at = normalize_or_now(&row.timestamp);
            let ts_ms = epoch_ms(occurred_at);
            if watermark.is_some_and(|w| ts_ms <= w) {
                stats.skipped_watermark += 1;
                continue;
            }

            match self.write_one_telemetry(row, occurred_at, ts_ms) {
                Ok(true) => stats.written += 1,
                Ok(false) => stats.skipped_duplicate += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        device_id = %row.device_id,
                        timestamp = %row.timestamp,
                        error = %e,
                        "telemetry write failed"
                    );
                }
            }
        }
        Ok(stats)
    }

    fn write_one_telemetry(
        &self,
        row: &RawTelemetryRow,
        occurred_at: NaiveDateTime,
        ts_ms: i64,
    ) -> wattlog_store::Result<bool> {
        if self
            .store
            .telemetry_exists_near(&row.device_id, ts_ms, self.telemetry_window_ms)?
        {
            return Ok(false);
        }

        self.store.telemetry_insert(&TelemetrySample {
            device_id: row.device_id.clone(),
            occurred_at,
            voltage_avg: row.voltage_avg,
            current_avg: row.current_avg,
            power_total: row.power_total,
            frequency: row.frequency,
            energy_kwh: row.energy_kwh,
            status: row.status.clone(),
        })?;
        Ok(true)
    }
}

/// Normalize a source timestamp, substituting the current wall-clock time
/// when it cannot be parsed. A single malformed row must not block the rest
/// of the batch.
fn normalize_or_now(raw: &str) -> NaiveDateTime {
    match parse_source_timestamp(raw) {
        Ok(ts) => ts,
        Err(e) => {
            tracing::warn!(timestamp = %raw, error = %e, "unparsable timestamp, substituting now");
            Local::now().naive_local()
        }
    }
}
