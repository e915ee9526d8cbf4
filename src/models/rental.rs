//! Rental model and pricing rules

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::enums::RentalStatus;

/// Rental model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Rental {
    pub rental_id: Uuid,
    pub item_id: Uuid,
    pub renter_id: Uuid,
    pub lender_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: RentalStatus,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub actual_end_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub actual_total_cost: Option<Decimal>,
    pub returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Rental {
    pub fn booked_days(&self) -> i64 {
        inclusive_days(self.start_date, self.end_date)
    }

    /// Price per day locked in when the rental was requested
    pub fn daily_rate(&self) -> Decimal {
        self.total_cost / Decimal::from(self.booked_days())
    }

    /// What the lender is owed: the settled cost once returned, the booked cost before
    pub fn amount_owed(&self) -> Decimal {
        self.actual_total_cost.unwrap_or(self.total_cost)
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.renter_id == user_id || self.lender_id == user_id
    }
}

/// Values for a rental insert
#[derive(Debug, Clone)]
pub struct NewRental {
    pub item_id: Uuid,
    pub renter_id: Uuid,
    pub lender_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_cost: Decimal,
}

/// Rental request body; the renter is the caller
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRental {
    pub item_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Values written when a rental is returned
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSettlement {
    pub actual_end_date: NaiveDate,
    pub actual_total_cost: Decimal,
    pub returned_at: DateTime<Utc>,
}

/// Side of a rental a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RentalRole {
    Renter,
    Lender,
}

/// Rental listing parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct RentalQuery {
    /// Only rentals where the user has this role (both when absent)
    pub role: Option<RentalRole>,
    pub status: Option<RentalStatus>,
}

/// Number of calendar days in `[start, end]`, counting both ends
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn rental_cost(price_per_day: Decimal, start: NaiveDate, end: NaiveDate) -> Decimal {
    price_per_day * Decimal::from(inclusive_days(start, end))
}

/// Settle a return made on `today`.
///
/// The renter pays for the days actually used, capped at the booked window:
/// a late return is never charged extra, and a return before the start date
/// is charged one day.
pub fn settle_return(rental: &Rental, today: NaiveDate, now: DateTime<Utc>) -> ReturnSettlement {
    let actual_end_date = today.min(rental.end_date).max(rental.start_date);
    let actual_total_cost =
        rental.daily_rate() * Decimal::from(inclusive_days(rental.start_date, actual_end_date));

    ReturnSettlement {
        actual_end_date,
        actual_total_cost,
        returned_at: now,
    }
}
