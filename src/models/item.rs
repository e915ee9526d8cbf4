//! Rentable listings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Item model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub item_id: Uuid,
    /// Owner of the listing
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    #[schema(value_type = String)]
    pub price_per_day: Decimal,
    pub image_url: Option<String>,
    /// False while a pending or active rental holds the item
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

/// Listing search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ItemQuery {
    /// Exact category
    pub category: Option<String>,
    /// Free-text search in title and description
    pub q: Option<String>,
}

/// Create listing request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(value_type = String)]
    pub price_per_day: Decimal,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,
}

pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("positive_amount"))
    }
}
