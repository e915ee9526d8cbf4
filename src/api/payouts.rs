//! Payout endpoint

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{payment::PayoutResponse, PayoutRequest},
    AppState,
};

use super::AuthenticatedUser;

/// Pay the lender of a returned rental
#[utoipa::path(
    post,
    path = "/payout",
    tag = "payouts",
    security(("bearer_auth" = [])),
    request_body = PayoutRequest,
    responses(
        (status = 200, description = "Payout completed", body = PayoutResponse),
        (status = 400, description = "Missing fields or amount above what is owed", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not the lender", body = crate::error::ErrorResponse),
        (status = 409, description = "Already paid or rental not returned", body = crate::error::ErrorResponse),
        (status = 422, description = "Payout did not complete", body = crate::error::ErrorResponse),
        (status = 502, description = "Payout agent failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn payout(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(request): Json<PayoutRequest>,
) -> AppResult<Json<PayoutResponse>> {
    let receipt = state.services.payouts.request_payout(&session, request).await?;
    Ok(Json(receipt.into()))
}
