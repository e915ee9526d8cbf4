//! API handlers for Rentwise REST endpoints

pub mod agents;
pub mod auth;
pub mod damage;
pub mod health;
pub mod items;
pub mod openapi;
pub mod orchestrator;
pub mod payouts;
pub mod rentals;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{any, get, post},
    Router,
};
use axum_extra::extract::multipart::Field;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::{ImageUpload, Session},
    AppState,
};

/// Evidence pictures come straight from phone cameras
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Extractor for the caller's session from the provider's bearer token
pub struct AuthenticatedUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let auth = &state.config.auth;
        let session = Session::from_token(token, &auth.jwt_secret, &auth.jwt_audience)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(session))
    }
}

/// Read a multipart file field
pub(crate) async fn read_image(field: Field) -> AppResult<ImageUpload> {
    let filename = field.file_name().unwrap_or("image").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {}", e)))?;

    Ok(ImageUpload {
        filename,
        content_type,
        bytes,
    })
}

/// Read a multipart text field
pub(crate) async fn read_text(field: Field) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {}", e)))
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Session
        .route("/auth/me", get(auth::me))
        // Listings
        .route("/items", get(items::list_items).post(items::create_item))
        .route("/items/:id", get(items::get_item))
        // Rentals
        .route("/rentals", get(rentals::list_rentals).post(rentals::create_rental))
        .route("/rentals/events", get(rentals::rental_events))
        .route("/rentals/:id", get(rentals::get_rental))
        .route("/rentals/:id/accept", post(rentals::accept_rental))
        .route("/rentals/:id/cancel", post(rentals::cancel_rental))
        .route("/rentals/:id/return", post(rentals::return_item))
        .route("/rentals/:id/damage-reports", get(damage::list_damage_reports))
        // Workflows
        .route("/verify-damage", post(damage::verify_damage))
        .route("/payout", post(payouts::payout))
        .route("/orchestrator", post(orchestrator::orchestrate))
        // Agents
        .route("/agents/:agent", any(agents::call_agent))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
