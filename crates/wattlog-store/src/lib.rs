//! DuckDB-backed store for registry entries, access events and telemetry.
//!
//! The store owns the three collections the sync engine writes and the
//! serving layer reads. Access events and telemetry samples are append-only;
//! registry entries are upserted by badge id. Instants are persisted as
//! epoch-millisecond BIGINTs so the dedup-window and watermark queries are
//! exact integer comparisons over indexed columns.

pub mod schema;

use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use wattlog_model::types::from_epoch_ms;
use wattlog_model::{AccessEvent, RegistryEntry, SessionStatus, TelemetrySample, UserStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] duckdb::Error),
    #[error("store connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Shared handle to the wattlog database.
///
/// Cheap to clone; all clones serialize on the same connection. DuckDB
/// rejects nothing the sync engine relies on transactionally — idempotency
/// comes from the upsert/window contracts, not from the storage engine.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened store");
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests and one-shot dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ---- registry ----

    /// Insert or overwrite a registry entry, keyed by badge id.
    pub fn registry_upsert(&self, entry: &RegistryEntry) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO registry_entries (badge_id, name, status)
             VALUES (?, ?, ?)
             ON CONFLICT (badge_id) DO UPDATE SET
                 name = excluded.name,
                 status = excluded.status",
            params![entry.badge_id, entry.name, entry.status.as_str()],
        )?;
        Ok(())
    }

    /// Look up a registry entry by normalized badge id.
    pub fn registry_get(&self, badge_id: &str) -> Result<Option<RegistryEntry>> {
        let conn = self.conn()?;
        optional(conn.query_row(
            "SELECT badge_id, name, status FROM registry_entries WHERE badge_id = ?",
            params![badge_id],
            |row| {
                Ok(RegistryEntry {
                    badge_id: row.get(0)?,
                    name: row.get(1)?,
                    status: UserStatus::from_str_or_inactive(&row.get::<_, String>(2)?),
                })
            },
        ))
    }

    pub fn registry_list(&self) -> Result<Vec<RegistryEntry>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT badge_id, name, status FROM registry_entries ORDER BY badge_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(RegistryEntry {
                badge_id: row.get(0)?,
                name: row.get(1)?,
                status: UserStatus::from_str_or_inactive(&row.get::<_, String>(2)?),
            })
        })?;
        rows.collect::<duckdb::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn registry_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM registry_entries", [], |row| {
            row.get(0)
        })
        .map_err(Into::into)
    }

    // ---- access events ----

    /// Append an access event. Callers must have run the dedup check first;
    /// the table itself accepts duplicates.
    pub fn access_event_insert(&self, event: &AccessEvent) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO access_events
                 (sequence_number, occurred_at_ms, device_id, session_start,
                  session_end, badge_id, resolved_user_name, session_status, duration)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                event.sequence_number,
                event.occurred_at_ms(),
                event.device_id,
                event.session_start,
                event.session_end,
                event.badge_id,
                event.resolved_user_name,
                event.session_status.as_str(),
                event.duration,
            ],
        )?;
        Ok(())
    }

    /// Whether an event for `badge_id` already exists with a timestamp in
    /// `[ts_ms - window_ms, ts_ms + window_ms]`.
    pub fn access_event_exists_near(
        &self,
        badge_id: &str,
        ts_ms: i64,
        window_ms: i64,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM access_events
             WHERE badge_id = ? AND occurred_at_ms BETWEEN ? AND ?",
            params![badge_id, ts_ms - window_ms, ts_ms + window_ms],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Most recent persisted access-event instant, if any (the watermark).
    pub fn access_event_latest_ms(&self) -> Result<Option<i64>> {
        let conn = self.conn()?;
        conn.query_row("SELECT MAX(occurred_at_ms) FROM access_events", [], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .map_err(Into::into)
    }

    pub fn access_event_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM access_events", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Newest events first, for the dashboard feed.
    pub fn access_events_recent(&self, limit: usize) -> Result<Vec<AccessEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT sequence_number, occurred_at_ms, device_id, session_start,
                    session_end, badge_id, resolved_user_name, session_status, duration
             FROM access_events
             ORDER BY occurred_at_ms DESC
             LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(AccessEvent {
                sequence_number: row.get(0)?,
                occurred_at: from_epoch_ms(row.get(1)?).unwrap_or_default(),
                device_id: row.get(2)?,
                session_start: row.get(3)?,
                session_end: row.get(4)?,
                badge_id: row.get(5)?,
                resolved_user_name: row.get(6)?,
                session_status: SessionStatus::from_str_or_disconnected(
                    &row.get::<_, String>(7)?,
                ),
                duration: row.get(8)?,
            })
        })?;
        rows.collect::<duckdb::Result<Vec<_>>>().map_err(Into::into)
    }

    // ---- telemetry ----

    /// Append a telemetry sample. Dedup is the caller's responsibility.
    pub fn telemetry_insert(&self, sample: &TelemetrySample) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO telemetry_samples
                 (device_id, occurred_at_ms, voltage_avg, current_avg,
                  power_total, frequency, energy_kwh, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                sample.device_id,
                sample.occurred_at_ms(),
                sample.voltage_avg,
                sample.current_avg,
                sample.power_total,
                sample.frequency,
                sample.energy_kwh,
                sample.status,
            ],
        )?;
        Ok(())
    }

    /// Whether a sample for `device_id` already exists with a timestamp in
    /// `[ts_ms - window_ms, ts_ms + window_ms]`.
    pub fn telemetry_exists_near(
        &self,
        device_id: &str,
        ts_ms: i64,
        window_ms: i64,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM telemetry_samples
             WHERE device_id = ? AND occurred_at_ms BETWEEN ? AND ?",
            params![device_id, ts_ms - window_ms, ts_ms + window_ms],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Most recent persisted telemetry instant, if any (the watermark).
    pub fn telemetry_latest_ms(&self) -> Result<Option<i64>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT MAX(occurred_at_ms) FROM telemetry_samples",
            [],
            |row| row.get::<_, Option<i64>>(0),
        )
        .map_err(Into::into)
    }

    pub fn telemetry_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM telemetry_samples", [], |row| {
            row.get(0)
        })
        .map_err(Into::into)
    }

    /// Newest samples first, for the dashboard feed.
    pub fn telemetry_recent(&self, limit: usize) -> Result<Vec<TelemetrySample>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT device_id, occurred_at_ms, voltage_avg, current_avg,
                    power_total, frequency, energy_kwh, status
             FROM telemetry_samples
             ORDER BY occurred_at_ms DESC
             LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TelemetrySample {
                device_id: row.get(0)?,
                occurred_at: from_epoch_ms(row.get(1)?).unwrap_or_default(),
                voltage_avg: row.get(2)?,
                current_avg: row.get(3)?,
                power_total: row.get(4)?,
                frequency: row.get(5)?,
                energy_kwh: row.get(6)?,
                status: row.get(7)?,
            })
        })?;
        rows.collect::<duckdb::Result<Vec<_>>>().map_err(Into::into)
    }
}

/// Collapse `QueryReturnedNoRows` into `None`.
fn optional<T>(result: duckdb::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
