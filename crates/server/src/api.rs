//! Dashboard REST endpoints
//!
//! Thin handlers over the reconciler: deserialize, call the one relevant
//! service method, return the resulting state snapshot so clients always see
//! the effect of their own request.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use deskglow_domain::{CallStatsOverlay, StateSnapshot, Status};
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;

/// Body for manual status submissions.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: Status,
}

/// Body for monitoring toggles.
#[derive(Debug, Deserialize)]
pub struct MonitoringBody {
    pub enabled: bool,
}

/// GET /api/status: current application state.
pub async fn get_status(State(ctx): State<Arc<AppContext>>) -> Json<StateSnapshot> {
    Json(ctx.reconciler.snapshot().await)
}

/// POST /api/status: manual status override.
pub async fn post_status(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<StatusBody>,
) -> Json<StateSnapshot> {
    ctx.reconciler.set_manual_status(body.status).await;
    Json(ctx.reconciler.snapshot().await)
}

/// DELETE /api/status: clear an active manual override, handing the LED
/// back to the scraper.
pub async fn delete_status(State(ctx): State<Arc<AppContext>>) -> Json<StateSnapshot> {
    ctx.reconciler.clear_override().await;
    Json(ctx.reconciler.snapshot().await)
}

/// POST /api/stats: overlay manual statistics fields.
pub async fn post_stats(
    State(ctx): State<Arc<AppContext>>,
    Json(overlay): Json<CallStatsOverlay>,
) -> Json<StateSnapshot> {
    ctx.reconciler.set_manual_stats(overlay).await;
    Json(ctx.reconciler.snapshot().await)
}

/// POST /api/agents/{extension}/status: override one roster agent.
pub async fn post_agent_status(
    State(ctx): State<Arc<AppContext>>,
    Path(extension): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<StateSnapshot>, AppError> {
    ctx.reconciler.set_agent_status(&extension, body.status).await?;
    Ok(Json(ctx.reconciler.snapshot().await))
}

/// POST /api/monitoring: enable or disable LED monitoring.
pub async fn post_monitoring(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<MonitoringBody>,
) -> (StatusCode, Json<StateSnapshot>) {
    ctx.reconciler.set_monitoring(body.enabled).await;
    (StatusCode::OK, Json(ctx.reconciler.snapshot().await))
}
