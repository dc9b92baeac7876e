//! The three extraction functions: raw sheet rows → typed candidates.
//!
//! Shared behavior: the header row is dropped; a reachable-but-short table
//! (fewer than 2 rows) yields an empty batch; a read failure is logged and
//! also yields an empty batch, because the orchestrator must still attempt
//! the other tables this tick. Identifier-like cells are trimmed and
//! upper-cased, numeric cells coerce to 0 on failure, and missing cells read
//! as empty text.

use crate::tabular::TabularSource;
use serde::{Deserialize, Serialize};
use wattlog_model::{
    normalize_badge_id, RegistryEntry, UserStatus, DEFAULT_DEVICE_ID, DEFAULT_TELEMETRY_STATUS,
};

/// Registered-user whitelist: badge id, name, status.
pub const WHITELIST_RANGE: &str = "Whitelist!A:C";
/// RFID access log: no, timestamp, machine, on, off, badge, name, status, duration.
pub const ACCESS_LOG_RANGE: &str = "Log!A:I";
/// Power-meter log: timestamp, V_Avg, I_Avg, P, Freq, Energy, status.
pub const TELEMETRY_LOG_RANGE: &str = "Log_Monitoring_Energi_PM2230!A:G";

/// An access-log row before timestamp normalization and registry resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAccessRow {
    pub sequence_number: i64,
    /// Unparsed source timestamp; the writer normalizes it.
    pub timestamp: String,
    pub device_id: String,
    pub session_start: String,
    pub session_end: String,
    /// Already in normalized badge form.
    pub badge_id: String,
    pub reported_user_name: Option<String>,
    /// Trimmed, upper-cased status token as reported by the device.
    pub reported_status: String,
    pub duration: String,
}

/// A telemetry row before timestamp normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTelemetryRow {
    /// Unparsed source timestamp; the writer normalizes it.
    pub timestamp: String,
    pub device_id: String,
    pub voltage_avg: f64,
    pub current_avg: f64,
    pub power_total: f64,
    pub frequency: f64,
    pub energy_kwh: f64,
    pub status: String,
}

/// Fetch whitelist rows as registry candidates.
///
/// Rows with an empty badge id are dropped; a missing status cell defaults
/// to inactive.
pub async fn fetch_registry_entries<S: TabularSource + ?Sized>(source: &S) -> Vec<RegistryEntry> {
    let rows = match source.fetch_table(WHITELIST_RANGE).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(range = WHITELIST_RANGE, error = %e, "whitelist fetch failed");
            return Vec::new();
        }
    };
    if rows.len() < 2 {
        return Vec::new();
    }

    rows[1..]
        .iter()
        .filter_map(|row| {
            let badge_id = normalize_badge_id(cell(row, 0));
            if badge_id.is_empty() {
                return None;
            }
            Some(RegistryEntry {
                badge_id,
                name: cell(row, 1).trim().to_string(),
                status: UserStatus::from_source_token(cell(row, 2)),
            })
        })
        .collect()
}

/// Fetch the newest `limit` access-log rows, newest first.
pub async fn fetch_access_rows<S: TabularSource + ?Sized>(
    source: &S,
    limit: usize,
) -> Vec<RawAccessRow> {
    let rows = match source.fetch_table(ACCESS_LOG_RANGE).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(range = ACCESS_LOG_RANGE, error = %e, "access log fetch failed");
            return Vec::new();
        }
    };
    if rows.len() < 2 {
        return Vec::new();
    }

    let data = &rows[1..];
    let tail_start = data.len().saturating_sub(limit);
    let mut out: Vec<RawAccessRow> = data[tail_start..]
        .iter()
        .enumerate()
        .map(|(index, row)| RawAccessRow {
            // Source row number when numeric, position in the tail otherwise.
            sequence_number: cell(row, 0)
                .trim()
                .parse::<i64>()
                .unwrap_or(index as i64 + 1),
            timestamp: cell(row, 1).to_string(),
            device_id: cell(row, 2).trim().to_string(),
            session_start: cell(row, 3).trim().to_string(),
            session_end: cell(row, 4).trim().to_string(),
            badge_id: normalize_badge_id(cell(row, 5)),
            reported_user_name: non_empty(cell(row, 6)),
            reported_status: cell(row, 7).trim().to_uppercase(),
            duration: cell(row, 8).trim().to_string(),
        })
        .collect();
    out.reverse();
    out
}

/// Fetch the newest `limit` telemetry rows, newest first.
///
/// The meters do not send a device id yet, so every row is tagged with the
/// fixed default.
pub async fn fetch_telemetry_rows<S: TabularSource + ?Sized>(
    source: &S,
    limit: usize,
) -> Vec<RawTelemetryRow> {
    let rows = match source.fetch_table(TELEMETRY_LOG_RANGE).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(range = TELEMETRY_LOG_RANGE, error = %e, "telemetry fetch failed");
            return Vec::new();
        }
    };
    if rows.len() < 2 {
        return Vec::new();
    }

    let data = &rows[1..];
    let tail_start = data.len().saturating_sub(limit);
    let mut out: Vec<RawTelemetryRow> = data[tail_start..]
        .iter()
        .map(|row| RawTelemetryRow {
            timestamp: cell(row, 0).to_string(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            voltage_avg: safe_f64(cell(row, 1)),
            current_avg: safe_f64(cell(row, 2)),
            power_total: safe_f64(cell(row, 3)),
            frequency: safe_f64(cell(row, 4)),
            energy_kwh: safe_f64(cell(row, 5)),
            status: match cell(row, 6).trim() {
                "" => DEFAULT_TELEMETRY_STATUS.to_string(),
                s => s.to_string(),
            },
        })
        .collect();
    out.reverse();
    out
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Numeric coercion: unparsable, missing or negative readings become 0.
fn safe_f64(s: &str) -> f64 {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn whitelist_rows_become_registry_entries() {
        let source = MemorySource::new().with_table(
            WHITELIST_RANGE,
            vec![
                row(&["UID", "Nama", "Status"]),
                row(&["ab12", " Jane Doe ", "aktif"]),
                row(&["cd34", "Joe Bloggs", "NONAKTIF"]),
            ],
        );

        let entries = fetch_registry_entries(&source).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].badge_id, "AB12");
        assert_eq!(entries[0].name, "Jane Doe");
        assert_eq!(entries[0].status, UserStatus::Active);
        assert_eq!(entries[1].status, UserStatus::Inactive);
    }

    #[tokio::test]
    async fn whitelist_drops_rows_without_badge() {
        let source = MemorySource::new().with_table(
            WHITELIST_RANGE,
            vec![
                row(&["UID", "Nama", "Status"]),
                row(&["", "Ghost", "aktif"]),
                row(&["ab12", "Jane Doe"]),
            ],
        );

        let entries = fetch_registry_entries(&source).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].badge_id, "AB12");
        // Missing status cell defaults to inactive.
        assert_eq!(entries[0].status, UserStatus::Inactive);
    }

    #[tokio::test]
    async fn header_only_table_yields_empty_batch() {
        let source = MemorySource::new()
            .with_table(WHITELIST_RANGE, vec![row(&["UID", "Nama", "Status"])])
            .with_table(ACCESS_LOG_RANGE, vec![row(&["No", "Timestamp"])])
            .with_table(TELEMETRY_LOG_RANGE, vec![row(&["Timestamp", "V"])]);

        assert!(fetch_registry_entries(&source).await.is_empty());
        assert!(fetch_access_rows(&source, 100).await.is_empty());
        assert!(fetch_telemetry_rows(&source, 100).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_table_yields_empty_batch() {
        let source = MemorySource::new().with_failure(ACCESS_LOG_RANGE);
        assert!(fetch_access_rows(&source, 100).await.is_empty());
        assert!(fetch_registry_entries(&source).await.is_empty());
    }

    #[tokio::test]
    async fn access_rows_map_fields_and_reverse() {
        let source = MemorySource::new().with_table(
            ACCESS_LOG_RANGE,
            vec![
                row(&["No", "Timestamp", "Mesin", "On", "Off", "UID", "Nama", "Status", "Durasi"]),
                row(&["1", "25/02/2026 9:21:19", "M1", "09:21", "09:25", "ab12", "Jane Doe", "on", "4m"]),
                row(&["2", "25/02/2026 9:50:52", "M1", "09:50", "", "cd34", "", "DITOLAK", ""]),
            ],
        );

        let rows = fetch_access_rows(&source, 100).await;
        assert_eq!(rows.len(), 2);
        // Newest first.
        assert_eq!(rows[0].sequence_number, 2);
        assert_eq!(rows[0].badge_id, "CD34");
        assert_eq!(rows[0].reported_user_name, None);
        assert_eq!(rows[0].reported_status, "DITOLAK");
        assert_eq!(rows[1].badge_id, "AB12");
        assert_eq!(rows[1].reported_user_name.as_deref(), Some("Jane Doe"));
        assert_eq!(rows[1].reported_status, "ON");
        assert_eq!(rows[1].timestamp, "25/02/2026 9:21:19");
    }

    #[tokio::test]
    async fn access_sequence_number_falls_back_to_position() {
        let source = MemorySource::new().with_table(
            ACCESS_LOG_RANGE,
            vec![
                row(&["No", "Timestamp", "Mesin", "On", "Off", "UID", "Nama", "Status", "Durasi"]),
                row(&["x", "25/02/2026 9:21:19", "M1", "", "", "ab12", "", "ON", ""]),
            ],
        );

        let rows = fetch_access_rows(&source, 100).await;
        assert_eq!(rows[0].sequence_number, 1);
    }

    #[tokio::test]
    async fn access_limit_takes_newest_tail() {
        let mut table = vec![row(&[
            "No", "Timestamp", "Mesin", "On", "Off", "UID", "Nama", "Status", "Durasi",
        ])];
        for i in 1..=5 {
            table.push(row(&[
                &i.to_string(),
                "25/02/2026 9:21:19",
                "M1",
                "",
                "",
                "ab12",
                "",
                "ON",
                "",
            ]));
        }
        let source = MemorySource::new().with_table(ACCESS_LOG_RANGE, table);

        let rows = fetch_access_rows(&source, 2).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sequence_number, 5);
        assert_eq!(rows[1].sequence_number, 4);
    }

    #[tokio::test]
    async fn telemetry_rows_coerce_numbers_and_default_fields() {
        let source = MemorySource::new().with_table(
            TELEMETRY_LOG_RANGE,
            vec![
                row(&["Timestamp", "V_Avg", "I_Avg", "P", "Freq", "Energy", "Status"]),
                row(&["25/02/2026 9:21:19", "230.1", "oops", "-4", "50", "12.5"]),
            ],
        );

        let rows = fetch_telemetry_rows(&source, 100).await;
        assert_eq!(rows.len(), 1);
        let sample = &rows[0];
        assert_eq!(sample.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(sample.voltage_avg, 230.1);
        assert_eq!(sample.current_avg, 0.0);
        assert_eq!(sample.power_total, 0.0);
        assert_eq!(sample.frequency, 50.0);
        assert_eq!(sample.energy_kwh, 12.5);
        assert_eq!(sample.status, DEFAULT_TELEMETRY_STATUS);
    }
}
