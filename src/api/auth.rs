//! Session endpoints. Sign-in itself happens at the auth provider.

use axum::{extract::State, Json};

use crate::{error::AppResult, models::User, AppState};

use super::AuthenticatedUser;

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = User),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 404, description = "No profile for this user", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.me(&session).await?;
    Ok(Json(user))
}
