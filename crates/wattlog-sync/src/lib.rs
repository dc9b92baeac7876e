//! The wattlog synchronization engine.
//!
//! One cycle pulls the whitelist, the access log and the telemetry log from
//! the tabular source and reconciles them into the store: registry entries
//! are upserted, events and samples are appended behind a watermark
//! pre-filter and a ±window dedup check. The engine owns the idempotency
//! invariant — re-running a cycle against an unchanged source writes
//! nothing.

pub mod engine;
pub mod resolver;
pub mod writer;

pub use engine::{StageOutcome, SyncEngine, SyncReport, SyncStage};
pub use resolver::RegistryResolver;
pub use writer::{DedupWriter, StageStats};
