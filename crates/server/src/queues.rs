//! Delivery-queue introspection.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use cadence_queue::{DeliveryQueue, QueueError, QueueStats};

use crate::state::AppState;

/// Counters for one named queue.
#[utoipa::path(
    get,
    path = "/queues/{name}/stats",
    tag = "Queues",
    params(("name" = String, Path, description = "Queue name")),
    responses(
        (status = 200, description = "Queue counters", body = Object),
        (status = 404, description = "Unknown queue", body = String)
    )
)]
pub(crate) async fn queue_stats(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<QueueStats>, (StatusCode, String)> {
    match state.queue.stats(&name).await {
        Ok(stats) => Ok(Json(stats)),
        Err(QueueError::QueueNotFound(name)) => Err((
            StatusCode::NOT_FOUND,
            format!("queue not found: {name}"),
        )),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = Object))
)]
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
