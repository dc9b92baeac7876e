//! HTTP surface for the wattlog sync engine.
//!
//! Two routes only: the authenticated sync trigger an external scheduler
//! calls on a fixed cadence, and a health probe. The dashboard and its read
//! endpoints live elsewhere; they consume the store this service writes.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::TriggerAuth;
pub use handlers::AppState;
pub use server::ApiServer;
