//! Registration DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{EventId, Registration, RegistrationId, UserId};

/// Request body for `POST /registrations`.
///
/// Unknown fields, including a `user_id` sent by older clients, are
/// ignored; the registering user always comes from the access token.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRegistrationRequest {
    /// Target event.
    pub event_id: EventId,
    /// Optional note (max 1000 characters).
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request body for `DELETE /registrations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteRegistrationRequest {
    /// Event whose registration to cancel.
    pub event_id: EventId,
}

/// Registration representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationDto {
    /// Registration identifier.
    pub id: RegistrationId,
    /// Event registered for.
    pub event_id: EventId,
    /// Registered user.
    pub user_id: UserId,
    /// Always `registered` for live records.
    pub status: String,
    /// When the registration was recorded.
    pub registration_time: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<Registration> for RegistrationDto {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            user_id: r.user_id,
            status: r.status.as_str().to_string(),
            registration_time: r.registration_time,
            updated_at: r.updated_at,
            comment: r.comment,
        }
    }
}

/// Response body for `DELETE /registrations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRegistrationResponse {
    /// Event whose registration was cancelled.
    pub event_id: EventId,
    /// Always `cancelled`.
    pub status: String,
}

/// Response body for `GET /registrations/my`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationListResponse {
    /// Registrations on this page.
    pub data: Vec<RegistrationDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
