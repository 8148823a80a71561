//! Sending-account endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use cadence_core::SendAccount;
use cadence_store::Store;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub daily_limit: u32,
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    warn!(error = %e, "store operation failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Register a sending account.
#[utoipa::path(
    post,
    path = "/accounts",
    tag = "Accounts",
    responses(
        (status = 200, description = "Account created", body = Object)
    )
)]
pub(crate) async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<SendAccount>, (StatusCode, String)> {
    let account = SendAccount::new(request.email, request.daily_limit);
    state
        .store
        .insert_account(account.clone())
        .await
        .map_err(internal)?;
    Ok(Json(account))
}

/// List sending accounts.
#[utoipa::path(
    get,
    path = "/accounts",
    tag = "Accounts",
    responses(
        (status = 200, description = "All accounts", body = Object)
    )
)]
pub(crate) async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SendAccount>>, (StatusCode, String)> {
    let accounts = state.store.list_accounts().await.map_err(internal)?;
    Ok(Json(accounts))
}
