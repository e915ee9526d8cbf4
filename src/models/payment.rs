//! Payments and payout results

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::PaymentStatus;

/// Payment model from database. Rows are written by the payout agent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub payment_id: Uuid,
    pub rental_id: Uuid,
    pub status: PaymentStatus,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A payout to settle
#[derive(Debug, Clone)]
pub struct PayoutCommand {
    pub rental_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
}

/// Payload handed to the payout agent. The amount travels as a JSON number.
#[derive(Debug, Serialize)]
pub struct PayoutInstruction {
    pub rental_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl From<&PayoutCommand> for PayoutInstruction {
    fn from(command: &PayoutCommand) -> Self {
        Self {
            rental_id: command.rental_id,
            user_id: command.user_id,
            amount: command.amount,
        }
    }
}

/// Payout request body. Fields are optional here so a missing one can be
/// reported by name.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PayoutRequest {
    pub rental_id: Option<Uuid>,
    /// The lender being paid
    pub user_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
}

impl PayoutRequest {
    /// Names of the absent fields on error. A zero amount counts as absent.
    pub fn into_command(self) -> Result<PayoutCommand, Vec<&'static str>> {
        let amount = self.amount.filter(|a| !a.is_zero());
        match (self.rental_id, self.user_id, amount) {
            (Some(rental_id), Some(user_id), Some(amount)) => Ok(PayoutCommand {
                rental_id,
                user_id,
                amount,
            }),
            (rental_id, user_id, amount) => {
                let mut missing = Vec::new();
                if rental_id.is_none() {
                    missing.push("rental_id");
                }
                if user_id.is_none() {
                    missing.push("user_id");
                }
                if amount.is_none() {
                    missing.push("amount");
                }
                Err(missing)
            }
        }
    }
}

/// Payout response body
#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutResponse {
    pub payment_id: String,
    pub status: String,
    pub message: String,
}

impl From<PayoutReceipt> for PayoutResponse {
    fn from(receipt: PayoutReceipt) -> Self {
        Self {
            payment_id: receipt.payment_id,
            status: receipt.status,
            message: "Payout processed".to_string(),
        }
    }
}

/// What the payout agent answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayoutReceipt {
    /// Identifier assigned by the payout agent
    pub payment_id: String,
    pub status: String,
}

impl PayoutReceipt {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed.as_str()
    }
}
