//! Record types and normalization rules shared across the wattlog crates.
//!
//! Everything in this crate is pure data: no I/O, no clocks, no storage.
//! The sync engine, the store and the HTTP layer all speak these types.

pub mod timestamp;
pub mod types;

pub use timestamp::{parse_source_timestamp, TimestampParseError};
pub use types::{
    normalize_badge_id, AccessEvent, RegistryEntry, SessionStatus, TelemetrySample, UserStatus,
    DEFAULT_DEVICE_ID, DEFAULT_TELEMETRY_STATUS, UNKNOWN_BADGE_NAME,
};
