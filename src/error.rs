//! Error types for Rentwise server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::agents::AgentError;

/// Stable numeric error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    MissingFields = 6,
    InvalidDateRange = 7,
    SelfRental = 8,
    ItemUnavailable = 9,
    InvalidState = 10,
    MissingEvidence = 11,
    UploadFailed = 12,
    PersistFailed = 13,
    AlreadyPaid = 14,
    PayoutIncomplete = 15,
    AgentNotFound = 16,
    MethodNotAllowed = 17,
    AgentStartFailed = 18,
    AgentExecutionFailed = 19,
    InvalidAgentResponse = 20,
    AgentTimeout = 21,
    Inconsistent = 22,
}

/// Broad failure classes, used to pick the HTTP status of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    ExternalProcess,
    Storage,
    Authorization,
    Authentication,
    Internal,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid date range: start date {start} is after end date {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Owners cannot rent their own item")]
    SelfRentalForbidden,

    #[error("Item {0} is not available")]
    ItemUnavailable(Uuid),

    #[error("Rental {rental_id} cannot be {action} while {status}")]
    InvalidState {
        rental_id: Uuid,
        status: String,
        action: &'static str,
    },

    #[error("A picture of the returned item is required")]
    MissingEvidence,

    #[error("Image upload failed: {0}")]
    UploadFailed(String),

    #[error("Verification agent failed: {0}")]
    VerificationAgentFailed(AgentError),

    #[error("Could not save record: {0}")]
    PersistFailed(String),

    #[error("Payment for rental {0} has already been processed")]
    AlreadyPaid(Uuid),

    #[error("Payout agent failed: {0}")]
    PayoutAgentFailed(AgentError),

    #[error("Payout agent returned a non-completed status: {0}")]
    PayoutIncomplete(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify the error into the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Authentication(_) => ErrorKind::Authentication,
            AppError::Forbidden(_) | AppError::SelfRentalForbidden => ErrorKind::Authorization,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Validation(_)
            | AppError::MissingFields(_)
            | AppError::InvalidDateRange { .. }
            | AppError::MissingEvidence => ErrorKind::Validation,
            AppError::ItemUnavailable(_)
            | AppError::InvalidState { .. }
            | AppError::AlreadyPaid(_) => ErrorKind::Conflict,
            AppError::Agent(AgentError::NotFound(_)) => ErrorKind::NotFound,
            AppError::Agent(AgentError::MethodNotAllowed(_)) => ErrorKind::Validation,
            AppError::Agent(_)
            | AppError::VerificationAgentFailed(_)
            | AppError::PayoutAgentFailed(_)
            | AppError::PayoutIncomplete(_) => ErrorKind::ExternalProcess,
            AppError::UploadFailed(_)
            | AppError::PersistFailed(_)
            | AppError::Inconsistent(_)
            | AppError::Database(_) => ErrorKind::Storage,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) | AppError::Forbidden(_) => ErrorCode::NotAuthorized,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::MissingFields(_) => ErrorCode::MissingFields,
            AppError::InvalidDateRange { .. } => ErrorCode::InvalidDateRange,
            AppError::SelfRentalForbidden => ErrorCode::SelfRental,
            AppError::ItemUnavailable(_) => ErrorCode::ItemUnavailable,
            AppError::InvalidState { .. } => ErrorCode::InvalidState,
            AppError::MissingEvidence => ErrorCode::MissingEvidence,
            AppError::UploadFailed(_) => ErrorCode::UploadFailed,
            AppError::PersistFailed(_) => ErrorCode::PersistFailed,
            AppError::AlreadyPaid(_) => ErrorCode::AlreadyPaid,
            AppError::PayoutIncomplete(_) => ErrorCode::PayoutIncomplete,
            AppError::Agent(e) | AppError::VerificationAgentFailed(e) | AppError::PayoutAgentFailed(e) => {
                agent_code(e)
            }
            AppError::Inconsistent(_) => ErrorCode::Inconsistent,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Agent(AgentError::MethodNotAllowed(_)) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Agent(AgentError::Timeout { .. })
            | AppError::VerificationAgentFailed(AgentError::Timeout { .. })
            | AppError::PayoutAgentFailed(AgentError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::PayoutIncomplete(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
                ErrorKind::Authorization => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::ExternalProcess => StatusCode::BAD_GATEWAY,
                ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

fn agent_code(error: &AgentError) -> ErrorCode {
    match error {
        AgentError::NotFound(_) => ErrorCode::AgentNotFound,
        AgentError::MethodNotAllowed(_) => ErrorCode::MethodNotAllowed,
        AgentError::StartFailed { .. } => ErrorCode::AgentStartFailed,
        AgentError::ExecutionFailed { .. } => ErrorCode::AgentExecutionFailed,
        AgentError::InvalidResponse { .. } => ErrorCode::InvalidAgentResponse,
        AgentError::Timeout { .. } => ErrorCode::AgentTimeout,
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Inconsistent(msg) => {
                tracing::error!("Inconsistent state: {}", msg);
                self.to_string()
            }
            _ => {
                if status.is_server_error() {
                    tracing::warn!("Request failed: {}", self);
                }
                self.to_string()
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
