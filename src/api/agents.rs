//! Direct agent calls

use axum::{
    extract::{Path, State},
    http::Method,
    Json,
};
use serde_json::{json, Value};

use crate::{error::AppResult, AppState};

use super::AuthenticatedUser;

/// Call a named agent with a JSON payload. Only POST is accepted.
#[utoipa::path(
    post,
    path = "/agents/{agent}",
    tag = "agents",
    security(("bearer_auth" = [])),
    params(
        ("agent" = crate::agents::AgentName, Path, description = "Agent name")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Agent answer", body = serde_json::Value),
        (status = 404, description = "Unknown agent", body = crate::error::ErrorResponse),
        (status = 405, description = "Method other than POST", body = crate::error::ErrorResponse),
        (status = 502, description = "Agent failed", body = crate::error::ErrorResponse),
        (status = 504, description = "Agent timed out", body = crate::error::ErrorResponse)
    )
)]
pub async fn call_agent(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    method: Method,
    Path(agent): Path<String>,
    payload: Option<Json<Value>>,
) -> AppResult<Json<Value>> {
    let payload = payload.map(|Json(value)| value).unwrap_or_else(|| json!({}));
    let answer = state.services.agents.dispatch(&method, &agent, payload).await?;
    Ok(Json(answer))
}
