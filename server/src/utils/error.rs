use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

pub type AppResult<T> = Result<T, AppError>;

/// Reasons a request collides with the current state of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("Already registered for this event")]
    AlreadyRegistered,

    #[error("Event is full")]
    EventFull,

    #[error("Event is not open for registration")]
    RegistrationClosed,

    #[error("Registration is already cancelled")]
    AlreadyCancelled,

    #[error("Registration is already checked in")]
    AlreadyCheckedIn,

    #[error("Check-in is only open on the day of the event")]
    CheckInClosed,

    #[error("Feedback already submitted for this event")]
    FeedbackExists,

    #[error("Feedback opens once the event has taken place")]
    FeedbackClosed,

    #[error("An account already exists for this email")]
    EmailTaken,
}

impl ConflictKind {
    pub fn reason(&self) -> &'static str {
        match self {
            ConflictKind::AlreadyRegistered => "ALREADY_REGISTERED",
            ConflictKind::EventFull => "EVENT_FULL",
            ConflictKind::RegistrationClosed => "REGISTRATION_CLOSED",
            ConflictKind::AlreadyCancelled => "ALREADY_CANCELLED",
            ConflictKind::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            ConflictKind::CheckInClosed => "CHECK_IN_CLOSED",
            ConflictKind::FeedbackExists => "FEEDBACK_EXISTS",
            ConflictKind::FeedbackClosed => "FEEDBACK_CLOSED",
            ConflictKind::EmailTaken => "EMAIL_TAKEN",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "STORE_UNAVAILABLE",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// The conflict reason, if this error is a ledger conflict.
    pub fn conflict(&self) -> Option<ConflictKind> {
        match self {
            AppError::Conflict(kind) => Some(*kind),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::Conflict(kind) => {
                warn!(code = self.code(), reason = kind.reason(), "Request conflicts with ledger state");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Store failures stay opaque to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(kind) => kind.to_string(),
            AppError::DatabaseError(_) => "The event store is unavailable".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        let details = self
            .conflict()
            .map(|kind| json!({ "reason": kind.reason() }));

        error_response(code, public_message, details, status)
    }
}
