//! HTTP surface for the remediation engine.
//!
//! Routes:
//! - `GET /` - liveness string
//! - `POST /alerts` - Alertmanager webhook receiver
//! - `POST /restart/{name}` - manual restart, bypassing the router
//! - `GET /metrics` - Prometheus text exposition
//!
//! The webhook is best-effort by contract: it answers `{"ok":true}`
//! even when individual remediations fail, matching Alertmanager's
//! fire-and-forget semantics. Failures are logged, not surfaced.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::alerts::AlertmanagerPayload;
use crate::config::RoutingTable;
use crate::executor::RemediationExecutor;
use crate::metrics::MetricsSink;

/// Shared state for all handlers.
pub struct ServerState {
    pub executor: Arc<RemediationExecutor>,
    pub routes: RoutingTable,
    pub metrics: Arc<MetricsSink>,
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(liveness_handler))
        .route("/alerts", post(alerts_handler))
        .route("/restart/{name}", post(restart_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn run_server(state: Arc<ServerState>, addr: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Remediator listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct RestartResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn liveness_handler() -> &'static str {
    "Remediator is running"
}

/// Alertmanager webhook receiver.
///
/// Each alert is processed independently, and each routed target is
/// processed independently of the others: one failure never blocks the
/// remaining targets in the same notification.
async fn alerts_handler(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<AlertmanagerPayload>,
) -> impl IntoResponse {
    info!("Received alert webhook: {} alerts", payload.alerts.len());

    for alert in &payload.alerts {
        let targets = state.routes.resolve_targets(alert.name());
        if targets.is_empty() {
            info!("no remediation defined for alert {}", alert.name());
            continue;
        }

        for target in targets {
            let outcome = state.executor.remediate(target).await;
            if !outcome.succeeded() {
                warn!(
                    "remediation of {target} for alert {}: {}",
                    alert.name(),
                    outcome.error_message()
                );
            }
        }
    }

    Json(OkResponse { ok: true })
}

/// Manual restart entry point, bypassing the alert router.
async fn restart_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let outcome = state.executor.remediate(&name).await;

    if outcome.succeeded() {
        Json(RestartResponse {
            ok: true,
            error: None,
        })
    } else {
        Json(RestartResponse {
            ok: false,
            error: Some(outcome.error_message()),
        })
    }
}

async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
