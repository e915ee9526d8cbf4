//! Damage reports and verification agent results

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::DamageReportStatus;

pub const DEFAULT_DESCRIPTION: &str = "Damage report";

/// Damage report model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DamageReport {
    pub report_id: Uuid,
    pub rental_id: Uuid,
    pub reporter_id: Uuid,
    pub description: String,
    pub image_before_url: Option<String>,
    pub image_after_url: String,
    pub damage_heatmap_url: Option<String>,
    /// 0.0 (no damage) to 1.0
    pub verification_score: Option<f64>,
    pub verified_by_agent: bool,
    pub status: DamageReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Values for a damage report insert
#[derive(Debug, Clone)]
pub struct NewDamageReport {
    pub rental_id: Uuid,
    pub reporter_id: Uuid,
    pub description: String,
    pub image_before_url: Option<String>,
    pub image_after_url: String,
    pub damage_heatmap_url: Option<String>,
    pub verification_score: Option<f64>,
    pub verified_by_agent: bool,
    pub status: DamageReportStatus,
}

/// An uploaded image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the verification agent answers
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerificationResult {
    #[serde(alias = "damage_severity")]
    pub verification_score: f64,
    #[serde(default, alias = "overlay_path")]
    pub damage_heatmap_url: Option<String>,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.verification_score)
    }
}
