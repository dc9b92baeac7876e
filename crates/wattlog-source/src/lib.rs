//! Read-only access to the external spreadsheet source.
//!
//! The source is a values API over three fixed logical tables (whitelist,
//! access log, telemetry log). Everything downstream of this crate works
//! with typed candidate records; raw untyped cells never cross the
//! extraction boundary.

pub mod client;
pub mod extract;
pub mod memory;
pub mod tabular;

pub use client::SheetsClient;
pub use extract::{
    fetch_access_rows, fetch_registry_entries, fetch_telemetry_rows, RawAccessRow,
    RawTelemetryRow, ACCESS_LOG_RANGE, TELEMETRY_LOG_RANGE, WHITELIST_RANGE,
};
pub use memory::MemorySource;
pub use tabular::{SourceError, TabularSource};
