//! Repository layer for database operations
//!
//! Each table sits behind a store trait. The services only see the traits;
//! [`Repository::postgres`] wires the PostgreSQL implementations.

pub mod damage_reports;
pub mod items;
pub mod payments;
pub mod rentals;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        item::{CreateItem, ItemQuery},
        rental::{RentalQuery, ReturnSettlement},
        DamageReport, Item, NewDamageReport, NewRental, Payment, Rental, RentalStatus, User,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<User>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, item_id: Uuid) -> AppResult<Item>;

    async fn list_available(&self, query: &ItemQuery) -> AppResult<Vec<Item>>;

    async fn create(&self, owner_id: Uuid, item: &CreateItem) -> AppResult<Item>;

    /// Mark an available item as taken. Returns false when it was not available.
    async fn claim(&self, item_id: Uuid) -> AppResult<bool>;

    /// Mark an item as available again
    async fn release(&self, item_id: Uuid) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn get(&self, rental_id: Uuid) -> AppResult<Rental>;

    async fn list_for_user(&self, user_id: Uuid, query: &RentalQuery) -> AppResult<Vec<Rental>>;

    /// Insert a `pending` rental
    async fn insert(&self, rental: &NewRental) -> AppResult<Rental>;

    /// Set the status to `to` if it is currently one of `from`.
    /// Returns `None` when the rental was in another state.
    async fn transition(
        &self,
        rental_id: Uuid,
        from: &[RentalStatus],
        to: RentalStatus,
    ) -> AppResult<Option<Rental>>;

    /// Move a pending or active rental to `returned` with its settlement.
    /// Returns `None` when the rental was in another state.
    async fn mark_returned(
        &self,
        rental_id: Uuid,
        settlement: &ReturnSettlement,
    ) -> AppResult<Option<Rental>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DamageReportStore: Send + Sync {
    async fn insert(&self, report: &NewDamageReport) -> AppResult<DamageReport>;

    async fn list_for_rental(&self, rental_id: Uuid) -> AppResult<Vec<DamageReport>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// The completed payment of a rental, if any
    async fn find_completed(&self, rental_id: Uuid) -> AppResult<Option<Payment>>;
}

/// Main repository struct holding the table stores
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub users: Arc<dyn UserStore>,
    pub items: Arc<dyn ItemStore>,
    pub rentals: Arc<dyn RentalStore>,
    pub damage_reports: Arc<dyn DamageReportStore>,
    pub payments: Arc<dyn PaymentStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            items: Arc::new(items::ItemsRepository::new(pool.clone())),
            rentals: Arc::new(rentals::RentalsRepository::new(pool.clone())),
            damage_reports: Arc::new(damage_reports::DamageReportsRepository::new(pool.clone())),
            payments: Arc::new(payments::PaymentsRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository from arbitrary store implementations
    pub fn new(
        users: Arc<dyn UserStore>,
        items: Arc<dyn ItemStore>,
        rentals: Arc<dyn RentalStore>,
        damage_reports: Arc<dyn DamageReportStore>,
        payments: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            pool: None,
            users,
            items,
            rentals,
            damage_reports,
            payments,
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
