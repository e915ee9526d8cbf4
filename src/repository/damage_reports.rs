//! Damage reports repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{DamageReport, NewDamageReport},
};

use super::DamageReportStore;

#[derive(Clone)]
pub struct DamageReportsRepository {
    pool: Pool<Postgres>,
}

impl DamageReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DamageReportStore for DamageReportsRepository {
    async fn insert(&self, report: &NewDamageReport) -> AppResult<DamageReport> {
        let created = sqlx::query_as::<_, DamageReport>(
            r#"
            INSERT INTO damage_reports (
                rental_id, reporter_id, description, image_before_url, image_after_url,
                damage_heatmap_url, verification_score, verified_by_agent, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(report.rental_id)
        .bind(report.reporter_id)
        .bind(&report.description)
        .bind(&report.image_before_url)
        .bind(&report.image_after_url)
        .bind(&report.damage_heatmap_url)
        .bind(report.verification_score)
        .bind(report.verified_by_agent)
        .bind(report.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_for_rental(&self, rental_id: Uuid) -> AppResult<Vec<DamageReport>> {
        let reports = sqlx::query_as::<_, DamageReport>(
            "SELECT * FROM damage_reports WHERE rental_id = $1 ORDER BY created_at",
        )
        .bind(rental_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }
}
