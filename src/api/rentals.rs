//! Rental endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{rental::RentalQuery, CreateRental, Rental},
    services::ledger::ReturnOutcome,
    AppState,
};

use super::{read_image, read_text, AuthenticatedUser};

/// Request an item for a date range
#[utoipa::path(
    post,
    path = "/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = CreateRental,
    responses(
        (status = 201, description = "Rental requested", body = Rental),
        (status = 400, description = "Invalid date range", body = crate::error::ErrorResponse),
        (status = 403, description = "Owner cannot rent own item", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Item not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_rental(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(request): Json<CreateRental>,
) -> AppResult<(StatusCode, Json<Rental>)> {
    let rental = state.services.ledger.create_rental_request(&session, request).await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

/// Rentals of the current user
#[utoipa::path(
    get,
    path = "/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(RentalQuery),
    responses(
        (status = 200, description = "Rentals, newest first", body = Vec<Rental>)
    )
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Query(query): Query<RentalQuery>,
) -> AppResult<Json<Vec<Rental>>> {
    let rentals = state.services.ledger.list_rentals(&session, &query).await?;
    Ok(Json(rentals))
}

#[utoipa::path(
    get,
    path = "/rentals/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental", body = Rental),
        (status = 403, description = "Not a party to the rental", body = crate::error::ErrorResponse),
        (status = 404, description = "Rental not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_rental(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.ledger.get_rental(&session, rental_id).await?;
    Ok(Json(rental))
}

/// Lender accepts a pending request
#[utoipa::path(
    post,
    path = "/rentals/{id}/accept",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental active", body = Rental),
        (status = 403, description = "Not the lender", body = crate::error::ErrorResponse),
        (status = 409, description = "Rental is not pending", body = crate::error::ErrorResponse)
    )
)]
pub async fn accept_rental(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.ledger.accept_rental(&session, rental_id).await?;
    Ok(Json(rental))
}

#[utoipa::path(
    post,
    path = "/rentals/{id}/cancel",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental cancelled", body = Rental),
        (status = 403, description = "Not a party to the rental", body = crate::error::ErrorResponse),
        (status = 409, description = "Rental already finished", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_rental(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.ledger.cancel_rental(&session, rental_id).await?;
    Ok(Json(rental))
}

/// Multipart form accepted by `POST /rentals/{id}/return`
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct ReturnForm {
    #[serde(rename = "afterImage")]
    #[schema(value_type = String, format = Binary)]
    pub after_image: Vec<u8>,
    pub description: Option<String>,
}

/// Return a rented item with a picture of its condition
#[utoipa::path(
    post,
    path = "/rentals/{id}/return",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rental ID")
    ),
    request_body(
        content = ReturnForm,
        content_type = "multipart/form-data",
        description = "Picture of the item as returned"
    ),
    responses(
        (status = 200, description = "Item returned", body = ReturnOutcome),
        (status = 400, description = "Missing picture", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the renter", body = crate::error::ErrorResponse),
        (status = 409, description = "Rental cannot be returned", body = crate::error::ErrorResponse),
        (status = 500, description = "Upload failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_item(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<ReturnOutcome>> {
    let mut after_image = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("afterImage") => after_image = Some(read_image(field).await?),
            Some("description") => description = Some(read_text(field).await?),
            _ => {}
        }
    }

    let outcome = state
        .services
        .ledger
        .return_item(&session, rental_id, after_image, description)
        .await?;
    Ok(Json(outcome))
}

/// Server-sent feed of changes to the current user's rentals
#[utoipa::path(
    get,
    path = "/rentals/events",
    tag = "rentals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "`rental` events carrying a RentalEvent", content_type = "text/event-stream")
    )
)]
pub async fn rental_events(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = state
        .services
        .events
        .subscribe(session.user_id)
        .filter_map(|event| match Event::default().event("rental").json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::warn!("Dropping unserializable rental event: {}", e);
                None
            }
        });

    Sse::new(feed).keep_alive(KeepAlive::default())
}
