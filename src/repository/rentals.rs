//! Rentals repository for database operations
//!
//! Status changes are conditional updates on the current status, so two
//! concurrent transitions of the same rental cannot both apply.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        rental::{RentalQuery, RentalRole, ReturnSettlement},
        NewRental, Rental, RentalStatus,
    },
};

use super::RentalStore;

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RentalStore for RentalsRepository {
    async fn get(&self, rental_id: Uuid) -> AppResult<Rental> {
        sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE rental_id = $1")
            .bind(rental_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", rental_id)))
    }

    async fn list_for_user(&self, user_id: Uuid, query: &RentalQuery) -> AppResult<Vec<Rental>> {
        let role = query.role.map(|role| match role {
            RentalRole::Renter => "renter",
            RentalRole::Lender => "lender",
        });

        let rentals = sqlx::query_as::<_, Rental>(
            r#"
            SELECT * FROM rentals
            WHERE (($2::text IS NULL AND (renter_id = $1 OR lender_id = $1))
                   OR ($2 = 'renter' AND renter_id = $1)
                   OR ($2 = 'lender' AND lender_id = $1))
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(role)
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rentals)
    }

    async fn insert(&self, rental: &NewRental) -> AppResult<Rental> {
        sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (item_id, renter_id, lender_id, start_date, end_date, status, total_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(rental.item_id)
        .bind(rental.renter_id)
        .bind(rental.lender_id)
        .bind(rental.start_date)
        .bind(rental.end_date)
        .bind(RentalStatus::Pending)
        .bind(rental.total_cost)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // rentals_one_open_per_item
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::ItemUnavailable(rental.item_id)
            }
            _ => AppError::Database(e),
        })
    }

    async fn transition(
        &self,
        rental_id: Uuid,
        from: &[RentalStatus],
        to: RentalStatus,
    ) -> AppResult<Option<Rental>> {
        let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();

        let rental = sqlx::query_as::<_, Rental>(
            "UPDATE rentals SET status = $2 WHERE rental_id = $1 AND status = ANY($3) RETURNING *",
        )
        .bind(rental_id)
        .bind(to)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rental)
    }

    async fn mark_returned(
        &self,
        rental_id: Uuid,
        settlement: &ReturnSettlement,
    ) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET status = 'returned',
                actual_end_date = $2,
                actual_total_cost = $3,
                returned_at = $4
            WHERE rental_id = $1 AND status IN ('pending', 'active')
            RETURNING *
            "#,
        )
        .bind(rental_id)
        .bind(settlement.actual_end_date)
        .bind(settlement.actual_total_cost)
        .bind(settlement.returned_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rental)
    }
}
