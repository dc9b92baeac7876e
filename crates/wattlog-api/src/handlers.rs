//! Request handlers for the trigger and health routes.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;
use wattlog_sync::{SyncEngine, SyncReport};

use crate::auth::TriggerAuth;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub auth: TriggerAuth,
    /// Serializes cycles: overlapping triggers queue instead of racing the
    /// dedup check.
    pub cycle_lock: Arc<Mutex<()>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>, auth: TriggerAuth) -> Self {
        if !auth.is_configured() {
            tracing::warn!("no trigger token configured; all trigger requests will be rejected");
        }
        Self {
            engine,
            auth,
            cycle_lock: Arc::new(Mutex::new(())),
            start_time: Instant::now(),
        }
    }
}

/// Body returned by a successful trigger.
#[derive(Debug, Serialize)]
pub struct SyncTriggerResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    pub cycle_id: Uuid,
    pub report: SyncReport,
}

/// Run one sync cycle.
///
/// Row-level and stage-level problems are already handled inside the engine;
/// the cycle reports success whenever it ran its stages, even if individual
/// rows were skipped. Only a bad token (401) or a crashed cycle (500) reach
/// the caller as failures.
pub async fn trigger_sync(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !state.auth.validate(authorization) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "message": "Unauthorized"
            })),
        )
            .into_response();
    }

    let engine = state.engine.clone();
    let lock = state.cycle_lock.clone();
    let cycle = tokio::spawn(async move {
        let _guard = lock.lock().await;
        engine.run_cycle().await
    })
    .await;

    match cycle {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncTriggerResponse {
                success: true,
                message: "Sync completed successfully".to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                cycle_id: Uuid::new_v4(),
                report,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "sync cycle crashed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Sync failed"
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub registry_entries: i64,
    pub access_events: i64,
    pub telemetry_samples: i64,
}

/// Liveness probe for the external scheduler.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.engine.store();
    let count_or_zero = |result: wattlog_store::Result<i64>, what: &str| match result {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "failed to count {what}");
            0
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        registry_entries: count_or_zero(store.registry_count(), "registry entries"),
        access_events: count_or_zero(store.access_event_count(), "access events"),
        telemetry_samples: count_or_zero(store.telemetry_count(), "telemetry samples"),
    })
}
