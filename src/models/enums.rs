//! Status enums stored as text columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Stores an enum in a TEXT column through its `as_str`/`FromStr` pair
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// RentalStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a rental
///
/// `pending -> active -> returned -> completed`, with `cancelled` reachable
/// from any state that is not terminal. A rental can also be returned
/// straight from `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Active,
    Returned,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Active => "active",
            RentalStatus::Returned => "returned",
            RentalStatus::Completed => "completed",
            RentalStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }

    /// Whether the rental still holds its item
    pub fn holds_item(&self) -> bool {
        matches!(self, RentalStatus::Pending | RentalStatus::Active)
    }
}

impl std::str::FromStr for RentalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RentalStatus::Pending),
            "active" => Ok(RentalStatus::Active),
            "returned" => Ok(RentalStatus::Returned),
            "completed" => Ok(RentalStatus::Completed),
            "cancelled" => Ok(RentalStatus::Cancelled),
            _ => Err(format!("Invalid rental status: {}", s)),
        }
    }
}

text_column!(RentalStatus);

// ---------------------------------------------------------------------------
// DamageReportStatus
// ---------------------------------------------------------------------------

/// Review state of a damage report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DamageReportStatus {
    /// Scored by the verification agent, awaiting a decision
    Pending,
    /// No score yet; needs a manual or later automated review
    PendingReview,
}

impl DamageReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageReportStatus::Pending => "pending",
            DamageReportStatus::PendingReview => "pending_review",
        }
    }
}

impl std::str::FromStr for DamageReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DamageReportStatus::Pending),
            "pending_review" => Ok(DamageReportStatus::PendingReview),
            _ => Err(format!("Invalid damage report status: {}", s)),
        }
    }
}

text_column!(DamageReportStatus);

// ---------------------------------------------------------------------------
// PaymentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

text_column!(PaymentStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rental_status_round_trip() {
        for status in [
            RentalStatus::Pending,
            RentalStatus::Active,
            RentalStatus::Returned,
            RentalStatus::Completed,
            RentalStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<RentalStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.to_string())
            );
        }
        assert!("flagged".parse::<RentalStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(RentalStatus::Completed.is_terminal());
        assert!(RentalStatus::Cancelled.is_terminal());
        assert!(!RentalStatus::Returned.is_terminal());
        assert!(RentalStatus::Active.holds_item());
        assert!(!RentalStatus::Returned.holds_item());
    }

    #[test]
    fn test_damage_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DamageReportStatus::PendingReview).unwrap(),
            "\"pending_review\""
        );
    }
}
