//! Platform error types with HTTP status code mapping.
//!
//! [`PlatformError`] is the central error type for both service roles.
//! Each variant maps to a specific HTTP status code and structured JSON
//! error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventId, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2103,
///     "message": "event 7 is full",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`PlatformError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                  |
/// |-----------|-----------------------|------------------------------|
/// | 1000–1999 | Auth / Validation     | 401 / 400 / 403              |
/// | 2000–2099 | Not Found             | 404 Not Found                |
/// | 2100–2199 | Registration Conflict | 409 Conflict                 |
/// | 3000–3999 | Server                | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Missing, malformed or expired access credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    ValidationError(String),

    /// The registration belongs to another user.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The caller has no live registration for the event.
    #[error("user is not registered for event {0}")]
    NotRegistered(EventId),

    /// A live registration already exists for the pair.
    #[error("user {user_id} is already registered for event {event_id}")]
    DuplicateRegistration {
        /// Event of the existing registration.
        event_id: EventId,
        /// User of the existing registration.
        user_id: UserId,
    },

    /// The event creator tried to register for their own event.
    #[error("the owner of event {0} cannot register for it")]
    OwnerCannotRegister(EventId),

    /// No free slot is left on the event.
    #[error("event {0} is full")]
    EventFull(EventId),

    /// Storage or transport failure; the operation had no effect.
    #[error("internal error: {0}")]
    Internal(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Capacity store and ledger are out of sync and need reconciliation.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

impl PlatformError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 1001,
            Self::ValidationError(_) => 1002,
            Self::Forbidden(_) => 1003,
            Self::EventNotFound(_) => 2001,
            Self::NotRegistered(_) => 2002,
            Self::DuplicateRegistration { .. } => 2101,
            Self::OwnerCannotRegister(_) => 2102,
            Self::EventFull(_) => 2103,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Inconsistent(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::EventNotFound(_) | Self::NotRegistered(_) => StatusCode::NOT_FOUND,
            Self::DuplicateRegistration { .. }
            | Self::OwnerCannotRegister(_)
            | Self::EventFull(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::PersistenceError(_) | Self::Inconsistent(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` for failures the caller can act on (4xx); server-side
    /// failures return `false`.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_client_errors() {
        let id = EventId::new(1);
        assert!(PlatformError::EventFull(id).is_client_error());
        assert!(PlatformError::OwnerCannotRegister(id).is_client_error());
        assert!(PlatformError::NotRegistered(id).is_client_error());
        assert!(
            PlatformError::DuplicateRegistration {
                event_id: id,
                user_id: UserId::new(2),
            }
            .is_client_error()
        );
    }

    #[test]
    fn internal_and_inconsistent_are_server_errors() {
        assert_eq!(
            PlatformError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PlatformError::Inconsistent("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_status_and_code() {
        let response = PlatformError::EventFull(EventId::new(9)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
