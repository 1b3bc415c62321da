use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use deskglow_domain::AuthState;
use serde::Serialize;

use crate::context::AppContext;

/// Structured health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub monitoring: bool,
    pub device_connected: bool,
    pub auth_state: AuthState,
    pub scheduler_running: bool,
}

/// Structured health check endpoint. Always 200; degraded subsystems are
/// visible in the body, not the status code.
pub async fn health_check(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    let snapshot = ctx.reconciler.snapshot().await;
    let scheduler_running = ctx.scheduler.lock().await.is_running();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        monitoring: snapshot.monitoring,
        device_connected: snapshot.device_connected,
        auth_state: snapshot.auth_state,
        scheduler_running,
    })
}
