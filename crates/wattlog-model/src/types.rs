//! Core record types for the registry, access log and telemetry log.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Name persisted for an access event whose badge is not in the registry.
pub const UNKNOWN_BADGE_NAME: &str = "Unknown/Kartu asing";

/// Device identifier stamped on telemetry rows; the meters do not send one.
pub const DEFAULT_DEVICE_ID: &str = "MESIN_01";

/// Telemetry status used when the source leaves the column blank.
pub const DEFAULT_TELEMETRY_STATUS: &str = "Success";

/// Normalize a badge identifier for lookups and storage.
///
/// Badge ids arrive from the sheet with inconsistent casing and stray
/// whitespace; every comparison in the system goes through this form.
pub fn normalize_badge_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Whether a registered user may operate the machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    /// Map a raw whitelist cell to a status.
    ///
    /// The sheet uses Indonesian tokens (`AKTIF`/`NONAKTIF`); anything that
    /// is not recognizably active is treated as inactive.
    pub fn from_source_token(token: &str) -> Self {
        match token.trim().to_uppercase().as_str() {
            "AKTIF" | "ACTIVE" => Self::Active,
            _ => Self::Inactive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }

    pub fn from_str_or_inactive(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Active,
            _ => Self::Inactive,
        }
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Inactive
    }
}

/// Outcome of an access session, as served to the dashboard.
///
/// This is a closed set: whatever the devices report is mapped onto one of
/// these members at the reader boundary and never stored as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    On,
    Off,
    OffPowerLoss,
    Disconnected,
    Denied,
}

impl SessionStatus {
    /// Parse a reported status token. Returns `None` for tokens outside the
    /// closed set so the caller can log the offending value before defaulting.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "ON" => Some(Self::On),
            "OFF" => Some(Self::Off),
            "OFF_POWER_LOSS" => Some(Self::OffPowerLoss),
            "DISCONNECTED" => Some(Self::Disconnected),
            // DITOLAK is the denial token the devices actually emit.
            "DENIED" | "DITOLAK" => Some(Self::Denied),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::OffPowerLoss => "OFF_POWER_LOSS",
            Self::Disconnected => "DISCONNECTED",
            Self::Denied => "DENIED",
        }
    }

    pub fn from_str_or_disconnected(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Disconnected)
    }
}

/// A registered badge holder, upserted from the whitelist sheet every tick.
///
/// Entries are never deleted by the sync engine; stale badges linger until
/// removed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Unique key, already in [`normalize_badge_id`] form.
    pub badge_id: String,
    pub name: String,
    pub status: UserStatus,
}

/// One RFID swipe session, append-only once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Source-assigned row number. Informational only, not a uniqueness key.
    pub sequence_number: i64,
    /// Wall-clock instant the event occurred, via the timestamp normalizer.
    pub occurred_at: NaiveDateTime,
    pub device_id: String,
    /// Opaque display string from the source; not reparsed.
    pub session_start: String,
    /// Opaque display string from the source; not reparsed.
    pub session_end: String,
    /// Normalized badge id of the swiped card.
    pub badge_id: String,
    /// Resolved against the registry at write time.
    pub resolved_user_name: Option<String>,
    pub session_status: SessionStatus,
    /// Opaque display string from the source; not reparsed.
    pub duration: String,
}

impl AccessEvent {
    /// Storage encoding of `occurred_at`: epoch milliseconds of the
    /// wall-clock value. Window and watermark comparisons are integer
    /// arithmetic on this form.
    pub fn occurred_at_ms(&self) -> i64 {
        epoch_ms(self.occurred_at)
    }
}

/// One power-meter reading, append-only once written.
///
/// All readings are non-negative; missing or unparsable source cells have
/// already been normalized to 0 by the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub device_id: String,
    pub occurred_at: NaiveDateTime,
    pub voltage_avg: f64,
    pub current_avg: f64,
    pub power_total: f64,
    pub frequency: f64,
    pub energy_kwh: f64,
    pub status: String,
}

impl TelemetrySample {
    pub fn occurred_at_ms(&self) -> i64 {
        epoch_ms(self.occurred_at)
    }
}

/// Encode a wall-clock instant as epoch milliseconds for storage.
pub fn epoch_ms(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

/// Decode the storage encoding back into a wall-clock instant.
pub fn from_epoch_ms(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn badge_ids_are_trimmed_and_uppercased() {
        assert_eq!(normalize_badge_id("  ab12cd "), "AB12CD");
        assert_eq!(normalize_badge_id("AB12CD"), "AB12CD");
        assert_eq!(normalize_badge_id(""), "");
    }

    #[test]
    fn user_status_from_source_token() {
        assert_eq!(UserStatus::from_source_token("aktif"), UserStatus::Active);
        assert_eq!(UserStatus::from_source_token(" AKTIF "), UserStatus::Active);
        assert_eq!(UserStatus::from_source_token("ACTIVE"), UserStatus::Active);
        assert_eq!(
            UserStatus::from_source_token("NONAKTIF"),
            UserStatus::Inactive
        );
        assert_eq!(UserStatus::from_source_token(""), UserStatus::Inactive);
        assert_eq!(UserStatus::from_source_token("garbage"), UserStatus::Inactive);
    }

    #[test]
    fn session_status_parses_closed_set_only() {
        assert_eq!(SessionStatus::parse("ON"), Some(SessionStatus::On));
        assert_eq!(SessionStatus::parse("off"), Some(SessionStatus::Off));
        assert_eq!(
            SessionStatus::parse("OFF_POWER_LOSS"),
            Some(SessionStatus::OffPowerLoss)
        );
        assert_eq!(
            SessionStatus::parse("DITOLAK"),
            Some(SessionStatus::Denied)
        );
        assert_eq!(SessionStatus::parse("BOGUS"), None);
        assert_eq!(
            SessionStatus::from_str_or_disconnected("BOGUS"),
            SessionStatus::Disconnected
        );
    }

    #[test]
    fn status_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&SessionStatus::OffPowerLoss).unwrap();
        assert_eq!(json, "\"OFF_POWER_LOSS\"");
        let back: SessionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SessionStatus::OffPowerLoss);

        assert_eq!(
            serde_json::to_string(&UserStatus::Active).unwrap(),
            "\"ACTIVE\""
        );
    }

    #[test]
    fn epoch_ms_round_trips() {
        let ts = NaiveDate::from_ymd_opt(2026, 2, 25)
            .unwrap()
            .and_hms_opt(9, 21, 19)
            .unwrap();
        let ms = epoch_ms(ts);
        assert_eq!(from_epoch_ms(ms), Some(ts));
    }
}
