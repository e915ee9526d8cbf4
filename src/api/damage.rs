//! Damage verification endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::DamageReport,
    services::damage::DamageEvidence,
    AppState,
};

use super::{read_image, read_text, AuthenticatedUser};

fn parse_uuid(field: &str, value: &str) -> AppResult<Option<Uuid>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{} is not a valid UUID", field)))
}

/// Multipart form accepted by `POST /verify-damage`
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct VerifyDamageForm {
    pub rental_id: Uuid,
    /// Must be the caller
    pub reporter_id: Uuid,
    #[serde(rename = "beforeImage")]
    #[schema(value_type = String, format = Binary)]
    pub before_image: Vec<u8>,
    #[serde(rename = "afterImage")]
    #[schema(value_type = String, format = Binary)]
    pub after_image: Vec<u8>,
    pub description: Option<String>,
}

/// Score before and after pictures of a rented item
#[utoipa::path(
    post,
    path = "/verify-damage",
    tag = "damage",
    security(("bearer_auth" = [])),
    request_body(
        content = VerifyDamageForm,
        content_type = "multipart/form-data",
        description = "Evidence pictures and the rental they belong to"
    ),
    responses(
        (status = 201, description = "Damage report recorded", body = DamageReport),
        (status = 400, description = "Missing fields", body = crate::error::ErrorResponse),
        (status = 403, description = "Reporter is not a party to the rental", body = crate::error::ErrorResponse),
        (status = 404, description = "Rental not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Verification agent failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_damage(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DamageReport>)> {
    let mut evidence = DamageEvidence::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("beforeImage") => evidence.before_image = Some(read_image(field).await?),
            Some("afterImage") => evidence.after_image = Some(read_image(field).await?),
            Some("rental_id") => evidence.rental_id = parse_uuid("rental_id", &read_text(field).await?)?,
            Some("reporter_id") => {
                evidence.reporter_id = parse_uuid("reporter_id", &read_text(field).await?)?
            }
            Some("description") => evidence.description = Some(read_text(field).await?),
            _ => {}
        }
    }

    let report = state.services.damage.verify_damage(&session, evidence).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Damage reports filed for a rental
#[utoipa::path(
    get,
    path = "/rentals/{id}/damage-reports",
    tag = "damage",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Reports, oldest first", body = Vec<DamageReport>),
        (status = 403, description = "Not a party to the rental", body = crate::error::ErrorResponse),
        (status = 404, description = "Rental not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_damage_reports(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> AppResult<Json<Vec<DamageReport>>> {
    let reports = state.services.damage.list_reports(&session, rental_id).await?;
    Ok(Json(reports))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_field() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid("rental_id", &format!(" {} ", id)).unwrap(), Some(id));
        assert_eq!(parse_uuid("rental_id", "").unwrap(), None);
        assert!(matches!(parse_uuid("rental_id", "r1"), Err(AppError::Validation(_))));
    }
}
