//! Payments repository for database operations
//!
//! The payout agent writes payment rows; the server only reads them.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Payment, PaymentStatus},
};

use super::PaymentStore;

#[derive(Clone)]
pub struct PaymentsRepository {
    pool: Pool<Postgres>,
}

impl PaymentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentsRepository {
    async fn find_completed(&self, rental_id: Uuid) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE rental_id = $1 AND status = $2 LIMIT 1",
        )
        .bind(rental_id)
        .bind(PaymentStatus::Completed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}
