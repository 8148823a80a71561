//! Campaign and prospect CRUD endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use cadence_core::{Campaign, Prospect, SendingSchedule};
use cadence_store::Store;

use crate::state::AppState;

use super::types::{AddProspectsRequest, AddProspectsResponse, CreateCampaignRequest};

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    warn!(error = %e, "store operation failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Create a campaign in Draft.
#[utoipa::path(
    post,
    path = "/campaigns",
    tag = "Campaigns",
    responses(
        (status = 200, description = "Campaign created", body = Object)
    )
)]
pub(crate) async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<Json<Campaign>, (StatusCode, String)> {
    let schedule = request
        .schedule
        .filter(SendingSchedule::is_valid)
        .unwrap_or_default();

    let campaign = Campaign::new(
        request.team_id,
        request.name,
        request.account_id,
        request.daily_limit,
        schedule,
        request.steps,
    );
    state
        .store
        .insert_campaign(campaign.clone())
        .await
        .map_err(internal)?;
    Ok(Json(campaign))
}

/// List every campaign.
#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "Campaigns",
    responses(
        (status = 200, description = "All campaigns", body = Object)
    )
)]
pub(crate) async fn list_campaigns(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Campaign>>, (StatusCode, String)> {
    let campaigns = state.store.list_campaigns().await.map_err(internal)?;
    Ok(Json(campaigns))
}

/// Fetch one campaign.
#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign", body = Object),
        (status = 404, description = "Unknown campaign", body = String)
    )
)]
pub(crate) async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, (StatusCode, String)> {
    state
        .store
        .campaign(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("campaign not found: {id}")))
}

/// Add pending prospects to a campaign.
#[utoipa::path(
    post,
    path = "/campaigns/{id}/prospects",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Prospects added", body = Object),
        (status = 404, description = "Unknown campaign", body = String)
    )
)]
pub(crate) async fn add_prospects(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddProspectsRequest>,
) -> Result<Json<AddProspectsResponse>, (StatusCode, String)> {
    if state.store.campaign(id).await.map_err(internal)?.is_none() {
        return Err((StatusCode::NOT_FOUND, format!("campaign not found: {id}")));
    }

    let mut added = 0usize;
    for email in request.emails {
        state
            .store
            .insert_prospect(Prospect::new(id, email))
            .await
            .map_err(internal)?;
        added += 1;
    }
    Ok(Json(AddProspectsResponse { added }))
}

/// List a campaign's prospects.
#[utoipa::path(
    get,
    path = "/campaigns/{id}/prospects",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Prospects", body = Object),
        (status = 404, description = "Unknown campaign", body = String)
    )
)]
pub(crate) async fn list_prospects(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Prospect>>, (StatusCode, String)> {
    if state.store.campaign(id).await.map_err(internal)?.is_none() {
        return Err((StatusCode::NOT_FOUND, format!("campaign not found: {id}")));
    }
    let prospects = state
        .store
        .prospects_for_campaign(id)
        .await
        .map_err(internal)?;
    Ok(Json(prospects))
}
