//! Event DTOs for create, update, get and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{Event, EventId};
use crate::service::EventInput;

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Human-readable location.
    #[serde(default)]
    pub location: String,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
    /// Optional image path.
    #[serde(default)]
    pub image_path: String,
    /// Capacity including the creator (at least 2).
    pub max_participants: i32,
    /// Scheduled start (RFC 3339).
    pub start_time: DateTime<Utc>,
    /// Scheduled end (RFC 3339).
    pub end_time: DateTime<Utc>,
}

impl From<CreateEventRequest> for EventInput {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            category: req.category,
            location: req.location,
            latitude: req.latitude,
            longitude: req.longitude,
            image_path: req.image_path,
            max_participants: req.max_participants,
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

/// Request body for `PUT /events`: the event id plus a full set of
/// editable fields. `participants` and `created_by` are not accepted.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    /// Event to edit.
    pub id: EventId,
    /// Replacement field values.
    #[serde(flatten)]
    pub details: CreateEventRequest,
}

/// Event representation returned by every event endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventDto {
    /// Event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Category label.
    pub category: String,
    /// Human-readable location.
    pub location: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Image path, empty if none.
    pub image_path: String,
    /// Owner username.
    pub created_by: String,
    /// Capacity including the owner.
    pub max_participants: i32,
    /// Current occupancy including the owner.
    pub participants: i32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
    /// `active` or `cancelled`.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventDto {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            category: e.category,
            location: e.location,
            latitude: e.latitude,
            longitude: e.longitude,
            image_path: e.image_path,
            created_by: e.created_by,
            max_participants: e.max_participants,
            participants: e.participants,
            start_time: e.start_time,
            end_time: e.end_time,
            status: e.status.as_str().to_string(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Response body for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page.
    pub data: Vec<EventDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
