//! Listing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        item::{CreateItem, ItemQuery},
        Item,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Search available listings
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    params(ItemQuery),
    responses(
        (status = 200, description = "Available listings", body = Vec<Item>)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.catalog.search_items(&query).await?;
    Ok(Json(items))
}

/// Get a listing
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Listing", body = Item),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(item_id).await?;
    Ok(Json(item))
}

/// List an item for rent
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Listing created", body = Item),
        (status = 400, description = "Invalid listing", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let created = state.services.catalog.create_item(&session, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
