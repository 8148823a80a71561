//! Lifecycle command endpoints: start, pause, resume.
//!
//! The caller is assumed to be authorized already; team membership and
//! permission checks happen upstream of this surface.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use cadence_orchestrator::OrchestratorError;

use crate::state::AppState;

use super::types::CommandResponse;

/// 404 for unknown campaigns, 400 for precondition failures, 500 for
/// infrastructure errors.
fn map_error(err: OrchestratorError) -> (StatusCode, String) {
    let status = match &err {
        OrchestratorError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_precondition() => StatusCode::BAD_REQUEST,
        _ => {
            warn!(error = %err, "lifecycle command failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Start a draft campaign.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/start",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign started", body = Object),
        (status = 400, description = "Invalid transition or missing prerequisites", body = String),
        (status = 404, description = "Unknown campaign", body = String)
    )
)]
pub(crate) async fn start_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    let outcome = state
        .orchestrator
        .start_campaign(id)
        .await
        .map_err(map_error)?;
    Ok(Json(CommandResponse {
        enqueued_count: outcome.enqueued,
    }))
}

/// Pause an active campaign.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/pause",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign paused", body = Object),
        (status = 400, description = "Invalid transition", body = String),
        (status = 404, description = "Unknown campaign", body = String)
    )
)]
pub(crate) async fn pause_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    let outcome = state
        .orchestrator
        .pause_campaign(id)
        .await
        .map_err(map_error)?;
    Ok(Json(CommandResponse {
        enqueued_count: outcome.enqueued,
    }))
}

/// Resume a paused campaign.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/resume",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign resumed", body = Object),
        (status = 400, description = "Invalid transition", body = String),
        (status = 404, description = "Unknown campaign", body = String)
    )
)]
pub(crate) async fn resume_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    let outcome = state
        .orchestrator
        .resume_campaign(id)
        .await
        .map_err(map_error)?;
    Ok(Json(CommandResponse {
        enqueued_count: outcome.enqueued,
    }))
}
