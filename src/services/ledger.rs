//! Rental ledger service
//!
//! Owns the rental lifecycle: pending -> active -> returned -> completed,
//! with cancellation from any non-terminal state. An item is unavailable
//! exactly while a pending or active rental holds it.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        rental::{rental_cost, settle_return, RentalQuery},
        CreateRental, DamageReport, ImageUpload, NewRental, Rental, RentalStatus, Session,
    },
    repository::Repository,
    services::{damage::DamageService, events::RentalEvents},
};

/// A completed return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub rental: Rental,
    pub damage_report: DamageReport,
}

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
    damage: DamageService,
    events: RentalEvents,
}

impl LedgerService {
    pub fn new(repository: Repository, damage: DamageService, events: RentalEvents) -> Self {
        Self {
            repository,
            damage,
            events,
        }
    }

    /// Request an item for `[start_date, end_date]`. The item is claimed
    /// before the rental is written; if the write fails the claim is undone.
    pub async fn create_rental_request(
        &self,
        session: &Session,
        request: CreateRental,
    ) -> AppResult<Rental> {
        let CreateRental {
            item_id,
            start_date,
            end_date,
        } = request;

        if start_date > end_date {
            return Err(AppError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        let item = self.repository.items.get(item_id).await?;
        if item.user_id == session.user_id {
            return Err(AppError::SelfRentalForbidden);
        }
        if !item.available {
            return Err(AppError::ItemUnavailable(item_id));
        }

        // Lose the race here rather than after the insert
        if !self.repository.items.claim(item_id).await? {
            return Err(AppError::ItemUnavailable(item_id));
        }

        let new_rental = NewRental {
            item_id,
            renter_id: session.user_id,
            lender_id: item.user_id,
            start_date,
            end_date,
            total_cost: rental_cost(item.price_per_day, start_date, end_date),
        };

        let rental = match self.repository.rentals.insert(&new_rental).await {
            Ok(rental) => rental,
            // Another open rental holds the item; the claim is theirs
            Err(e @ AppError::ItemUnavailable(_)) => return Err(e),
            Err(e) => {
                if let Err(release_err) = self.repository.items.release(item_id).await {
                    tracing::error!(
                        "Item {} left unavailable after failed rental insert: {}",
                        item_id,
                        release_err
                    );
                    return Err(AppError::Inconsistent(format!(
                        "item {} claimed but rental not recorded ({}); release failed: {}",
                        item_id, e, release_err
                    )));
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Rental {} requested for item {} by {} ({} to {}, total {})",
            rental.rental_id,
            item_id,
            session.user_id,
            start_date,
            end_date,
            rental.total_cost
        );
        self.events.publish(&rental);
        Ok(rental)
    }

    /// A rental, for its renter or lender
    pub async fn get_rental(&self, session: &Session, rental_id: Uuid) -> AppResult<Rental> {
        let rental = self.repository.rentals.get(rental_id).await?;
        if !rental.is_party(session.user_id) {
            return Err(AppError::Forbidden(format!(
                "User {} is not part of rental {}",
                session.user_id, rental_id
            )));
        }
        Ok(rental)
    }

    pub async fn list_rentals(&self, session: &Session, query: &RentalQuery) -> AppResult<Vec<Rental>> {
        self.repository.rentals.list_for_user(session.user_id, query).await
    }

    /// Lender confirms a pending request
    pub async fn accept_rental(&self, session: &Session, rental_id: Uuid) -> AppResult<Rental> {
        let rental = self.repository.rentals.get(rental_id).await?;
        if rental.lender_id != session.user_id {
            return Err(AppError::Forbidden("Only the lender can accept a rental".to_string()));
        }

        let accepted = self
            .repository
            .rentals
            .transition(rental_id, &[RentalStatus::Pending], RentalStatus::Active)
            .await?;
        let accepted = match accepted {
            Some(rental) => rental,
            None => return Err(self.invalid_state(rental_id, "accepted").await),
        };

        tracing::info!("Rental {} accepted", rental_id);
        self.events.publish(&accepted);
        Ok(accepted)
    }

    /// Either party cancels a rental that has not finished. The item becomes
    /// available again if the rental was holding it.
    pub async fn cancel_rental(&self, session: &Session, rental_id: Uuid) -> AppResult<Rental> {
        let rental = self.repository.rentals.get(rental_id).await?;
        if !rental.is_party(session.user_id) {
            return Err(AppError::Forbidden(format!(
                "User {} is not part of rental {}",
                session.user_id, rental_id
            )));
        }

        let rentals = &self.repository.rentals;
        let holding = rentals
            .transition(
                rental_id,
                &[RentalStatus::Pending, RentalStatus::Active],
                RentalStatus::Cancelled,
            )
            .await?;

        let cancelled = match holding {
            Some(cancelled) => {
                self.release_item(&cancelled).await?;
                cancelled
            }
            // A returned rental no longer holds its item
            None => match rentals
                .transition(rental_id, &[RentalStatus::Returned], RentalStatus::Cancelled)
                .await?
            {
                Some(cancelled) => cancelled,
                None => return Err(self.invalid_state(rental_id, "cancelled").await),
            },
        };

        tracing::info!("Rental {} cancelled by {}", rental_id, session.user_id);
        self.events.publish(&cancelled);
        Ok(cancelled)
    }

    /// Renter hands the item back with a picture of its state
    pub async fn return_item(
        &self,
        session: &Session,
        rental_id: Uuid,
        after_image: Option<ImageUpload>,
        description: Option<String>,
    ) -> AppResult<ReturnOutcome> {
        self.return_item_on(session, rental_id, after_image, description, Utc::now().date_naive())
            .await
    }

    /// [`return_item`](Self::return_item) with an explicit return date.
    ///
    /// The evidence is uploaded before the rental moves to `returned`, so a
    /// failed upload leaves the rental untouched. The damage report is only
    /// written by the request that won the transition.
    pub async fn return_item_on(
        &self,
        session: &Session,
        rental_id: Uuid,
        after_image: Option<ImageUpload>,
        description: Option<String>,
        today: NaiveDate,
    ) -> AppResult<ReturnOutcome> {
        let rental = self.repository.rentals.get(rental_id).await?;
        if rental.renter_id != session.user_id {
            return Err(AppError::Forbidden("Only the renter can return an item".to_string()));
        }
        if !rental.status.holds_item() {
            return Err(AppError::InvalidState {
                rental_id,
                status: rental.status.to_string(),
                action: "returned",
            });
        }
        let after_image = after_image
            .filter(|image| !image.is_empty())
            .ok_or(AppError::MissingEvidence)?;

        let item = self.repository.items.get(rental.item_id).await?;
        let settlement = settle_return(&rental, today, Utc::now());

        let after_url = self.damage.upload_evidence(rental_id, &after_image).await?;

        let returned = match self.repository.rentals.mark_returned(rental_id, &settlement).await? {
            Some(returned) => returned,
            None => return Err(self.invalid_state(rental_id, "returned").await),
        };
        self.release_item(&returned).await?;

        tracing::info!(
            "Rental {} returned on {}, owed {} of {}",
            rental_id,
            settlement.actual_end_date,
            settlement.actual_total_cost,
            rental.total_cost
        );
        self.events.publish(&returned);

        let report = self
            .damage
            .assess_return(&returned, session.user_id, item.image_url, after_url, description)
            .await
            .map_err(|e| {
                tracing::error!("Rental {} returned but its damage report was not saved: {}", rental_id, e);
                e
            })?;

        Ok(ReturnOutcome {
            rental: returned,
            damage_report: report,
        })
    }

    async fn release_item(&self, rental: &Rental) -> AppResult<()> {
        self.repository
            .items
            .release(rental.item_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Rental {} is {} but item {} is still unavailable: {}",
                    rental.rental_id,
                    rental.status,
                    rental.item_id,
                    e
                );
                AppError::Inconsistent(format!(
                    "rental {} is {} but item {} could not be released: {}",
                    rental.rental_id, rental.status, rental.item_id, e
                ))
            })
    }

    /// Build the error for a transition that found the rental elsewhere
    async fn invalid_state(&self, rental_id: Uuid, action: &'static str) -> AppError {
        match self.repository.rentals.get(rental_id).await {
            Ok(current) => AppError::InvalidState {
                rental_id,
                status: current.status.to_string(),
                action,
            },
            Err(e) => e,
        }
    }
}
