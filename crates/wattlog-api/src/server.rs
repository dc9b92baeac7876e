//! Router assembly and the serve loop.

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wattlog_config::AppConfig;
use wattlog_sync::SyncEngine;

use crate::auth::TriggerAuth;
use crate::handlers::{health_check, trigger_sync, AppState};

/// The wattlog HTTP service.
pub struct ApiServer {
    bind_address: String,
    enable_cors: bool,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: &AppConfig, engine: Arc<SyncEngine>) -> Self {
        let auth = TriggerAuth::new(config.server.trigger_token.clone());
        Self {
            bind_address: config.server.bind_address(),
            enable_cors: config.server.enable_cors,
            state: AppState::new(engine, auth),
        }
    }

    /// Build the route table. The trigger accepts GET as well as POST
    /// because common scheduler invokers only speak GET.
    pub fn router(state: AppState, enable_cors: bool) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_check))
            .route("/sync", get(trigger_sync).post(trigger_sync))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        if enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }
        router
    }

    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind address {}", self.bind_address))?;
        let router = Self::router(self.state, self.enable_cors);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!(%addr, "wattlog api listening");

        axum::serve(listener, router)
            .await
            .context("server terminated")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wattlog_source::{MemorySource, ACCESS_LOG_RANGE, TELEMETRY_LOG_RANGE, WHITELIST_RANGE};
    use wattlog_store::Store;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn test_state(token: Option<&str>) -> AppState {
        let source = MemorySource::new()
            .with_table(
                WHITELIST_RANGE,
                vec![
                    row(&["UID", "Nama", "Status"]),
                    row(&["AB12", "Jane Doe", "aktif"]),
                ],
            )
            .with_table(
                ACCESS_LOG_RANGE,
                vec![
                    row(&["No", "Timestamp", "Mesin", "On", "Off", "UID", "Nama", "Status", "Durasi"]),
                    row(&["1", "25/02/2026 9:21:19", "M1", "09:21", "09:25", "AB12", "Jane Doe", "ON", "4m"]),
                ],
            )
            .with_table(
                TELEMETRY_LOG_RANGE,
                vec![
                    row(&["Timestamp", "V_Avg", "I_Avg", "P", "Freq", "Energy", "Status"]),
                    row(&["25/02/2026 9:21:00", "230.1", "1.2", "0.27", "50", "12.5", "Success"]),
                ],
            );

        let store = Store::open_in_memory().unwrap();
        let engine = Arc::new(SyncEngine::new(
            store,
            Arc::new(source),
            &AppConfig::default(),
        ));
        AppState::new(engine, TriggerAuth::new(token.map(str::to_string)))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn trigger_without_token_is_unauthorized() {
        let state = test_state(Some("s3cret"));
        let router = ApiServer::router(state.clone(), false);

        let response = router
            .oneshot(Request::post("/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // No cycle ran.
        assert_eq!(state.engine.store().access_event_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn trigger_with_wrong_token_is_unauthorized() {
        let router = ApiServer::router(test_state(Some("s3cret")), false);
        let response = router
            .oneshot(
                Request::post("/sync")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn trigger_with_token_runs_a_cycle() {
        let state = test_state(Some("s3cret"));
        let router = ApiServer::router(state.clone(), false);

        let response = router
            .oneshot(
                Request::post("/sync")
                    .header("Authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], serde_json::json!(true));
        assert_eq!(
            body["message"],
            serde_json::json!("Sync completed successfully")
        );
        assert!(body["timestamp"].is_string());
        assert_eq!(body["report"]["access_events"]["stats"]["written"], 1);

        let store = state.engine.store();
        assert_eq!(store.access_event_count().unwrap(), 1);
        assert_eq!(store.telemetry_count().unwrap(), 1);
        assert_eq!(store.registry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn trigger_accepts_get_for_plain_schedulers() {
        let router = ApiServer::router(test_state(Some("s3cret")), false);
        let response = router
            .oneshot(
                Request::get("/sync")
                    .header("Authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_store_counts() {
        let state = test_state(Some("s3cret"));
        let router = ApiServer::router(state.clone(), false);

        // Populate via one cycle, then probe.
        router
            .clone()
            .oneshot(
                Request::post("/sync")
                    .header("Authorization", "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], serde_json::json!("healthy"));
        assert_eq!(body["registry_entries"], 1);
        assert_eq!(body["access_events"], 1);
        assert_eq!(body["telemetry_samples"], 1);
    }
}
