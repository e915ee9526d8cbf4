//! Orchestrator endpoint

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

use super::AuthenticatedUser;

#[derive(Deserialize, ToSchema)]
pub struct OrchestratorRequest {
    /// One of `request_rental`, `match_items`, `price_rental`,
    /// `evaluate_trust`, `verify_damage`, `process_payouts`, `engage_users`
    pub action: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

/// Run an action through the orchestrator agent
#[utoipa::path(
    post,
    path = "/orchestrator",
    tag = "agents",
    security(("bearer_auth" = [])),
    request_body = OrchestratorRequest,
    responses(
        (status = 200, description = "Agent answer", body = serde_json::Value),
        (status = 400, description = "Unknown action", body = crate::error::ErrorResponse),
        (status = 502, description = "Orchestrator failed", body = crate::error::ErrorResponse),
        (status = 504, description = "Orchestrator timed out", body = crate::error::ErrorResponse)
    )
)]
pub async fn orchestrate(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Json(request): Json<OrchestratorRequest>,
) -> AppResult<Json<Value>> {
    let answer = state
        .services
        .orchestrator
        .forward(&request.action, request.payload)
        .await?;
    Ok(Json(answer))
}
