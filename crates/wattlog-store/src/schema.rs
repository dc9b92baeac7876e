//! Idempotent schema for the wattlog database.
//!
//! `occurred_at_ms` columns hold epoch milliseconds of the wall-clock
//! instant. The indexes back the dedup-window lookups and the watermark
//! queries the sync engine runs every tick.

pub const SCHEMA: &str = r#"
CREATE SEQUENCE IF NOT EXISTS seq_access_event_id START 1;
CREATE SEQUENCE IF NOT EXISTS seq_telemetry_sample_id START 1;

CREATE TABLE IF NOT EXISTS registry_entries (
    badge_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    status   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS access_events (
    id                 BIGINT PRIMARY KEY DEFAULT nextval('seq_access_event_id'),
    sequence_number    BIGINT NOT NULL,
    occurred_at_ms     BIGINT NOT NULL,
    device_id          TEXT NOT NULL,
    session_start      TEXT NOT NULL,
    session_end        TEXT NOT NULL,
    badge_id           TEXT NOT NULL,
    resolved_user_name TEXT,
    session_status     TEXT NOT NULL,
    duration           TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_access_events_time
    ON access_events (occurred_at_ms);
CREATE INDEX IF NOT EXISTS idx_access_events_badge_time
    ON access_events (badge_id, occurred_at_ms);

CREATE TABLE IF NOT EXISTS telemetry_samples (
    id             BIGINT PRIMARY KEY DEFAULT nextval('seq_telemetry_sample_id'),
    device_id      TEXT NOT NULL,
    occurred_at_ms BIGINT NOT NULL,
    voltage_avg    DOUBLE NOT NULL,
    current_avg    DOUBLE NOT NULL,
    power_total    DOUBLE NOT NULL,
    frequency      DOUBLE NOT NULL,
    energy_kwh     DOUBLE NOT NULL,
    status         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_telemetry_device_time
    ON telemetry_samples (device_id, occurred_at_ms);
"#;
