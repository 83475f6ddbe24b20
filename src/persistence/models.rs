//! Database row models for events and registrations.

use chrono::{DateTime, Utc};

use crate::domain::{
    Event, EventId, EventStatus, Registration, RegistrationId, RegistrationStatus, UserId,
};

/// Column list matching [`EventRow`], shared by every event query.
pub const EVENT_COLUMNS: &str = "id, name, description, category, location, latitude, longitude, \
     image_path, created_by, max_participants, participants, start_time, end_time, status, \
     created_at, updated_at";

/// Column list matching [`RegistrationRow`].
pub const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, status, registration_time, updated_at, comment";

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: i64,
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
    /// Optional image path.
    pub image_path: String,
    /// Owner username.
    pub created_by: String,
    /// Configured capacity.
    pub max_participants: i32,
    /// Current occupancy.
    pub participants: i32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
    /// Status string (`active`, `cancelled`).
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::new(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            location: row.location,
            latitude: row.latitude,
            longitude: row.longitude,
            image_path: row.image_path,
            created_by: row.created_by,
            max_participants: row.max_participants,
            participants: row.participants,
            start_time: row.start_time,
            end_time: row.end_time,
            status: EventStatus::parse(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `registrations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistrationRow {
    /// Primary key.
    pub id: i64,
    /// Referenced event (owned by the capacity side, no foreign key).
    pub event_id: i64,
    /// Registered user.
    pub user_id: i64,
    /// Status string; only `registered` is stored.
    pub status: String,
    /// Commit timestamp.
    pub registration_time: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional note.
    pub comment: Option<String>,
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Self {
            id: RegistrationId::new(row.id),
            event_id: EventId::new(row.event_id),
            user_id: UserId::new(row.user_id),
            status: RegistrationStatus::Registered,
            registration_time: row.registration_time,
            updated_at: row.updated_at,
            comment: row.comment,
        }
    }
}
