//! Event aggregate owned by the capacity side.
//!
//! An [`Event`] carries its configured `max_participants` and the live
//! `participants` count. The creator occupies the first slot, so a fresh
//! event always starts at one participant.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventId;
use crate::error::PlatformError;

/// Smallest allowed capacity: the creator plus one guest.
pub const MIN_CAPACITY: i32 = 2;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Accepting registrations.
    Active,
    /// Withdrawn by its owner.
    Cancelled,
}

impl EventStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the storage representation, defaulting unknown values to
    /// [`EventStatus::Active`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "cancelled" => Self::Cancelled,
            _ => Self::Active,
        }
    }
}

/// A stored event with its capacity counters.
///
/// Invariant: `0 < participants <= max_participants`. Only the capacity
/// service mutates `participants`, and only through a conditional update.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Event {
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
    /// Optional image path.
    pub image_path: String,
    /// Username of the creator (canonical owner identity).
    pub created_by: String,
    /// Configured capacity, at least [`MIN_CAPACITY`].
    pub max_participants: i32,
    /// Current occupancy including the creator.
    pub participants: i32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Returns `true` while the event takes new registrations.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, EventStatus::Active)
    }

    /// Returns `true` if `caller` is the event's owner.
    ///
    /// Comparison is exact on the trimmed username.
    #[must_use]
    pub fn is_owned_by(&self, caller: &str) -> bool {
        self.created_by.trim() == caller.trim()
    }

    /// Returns `true` while a further slot can be claimed.
    #[must_use]
    pub const fn has_free_slot(&self) -> bool {
        self.participants < self.max_participants
    }

    /// Returns `true` while a guest slot is occupied and may be freed.
    #[must_use]
    pub const fn has_guest_slot(&self) -> bool {
        self.participants > 1
    }
}

/// Validated input for inserting a new event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
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
    /// Owner username, taken from the caller identity.
    pub created_by: String,
    /// Configured capacity.
    pub max_participants: i32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
}

impl NewEvent {
    /// Checks the scheduling, capacity and coordinate rules against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::ValidationError`] naming the first rule
    /// that fails.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), PlatformError> {
        if self.created_by.trim().is_empty() {
            return Err(invalid("owner username must not be empty"));
        }
        check_details(
            &self.name,
            self.max_participants,
            self.start_time,
            self.end_time,
            self.latitude,
            self.longitude,
            now,
        )
    }
}

/// Owner-editable fields of an existing event.
///
/// The participant count and the owner are not editable.
#[derive(Debug, Clone, PartialEq)]
pub struct EventChanges {
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
    /// New capacity; must not drop below the current participant count.
    pub max_participants: i32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
}

impl EventChanges {
    /// Applies the same field rules as [`NewEvent::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::ValidationError`] naming the first rule
    /// that fails.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), PlatformError> {
        check_details(
            &self.name,
            self.max_participants,
            self.start_time,
            self.end_time,
            self.latitude,
            self.longitude,
            now,
        )
    }

    /// Copies the changes onto `event`, leaving counters and ownership alone.
    pub fn apply_to(self, event: &mut Event) {
        event.name = self.name;
        event.description = self.description;
        event.category = self.category;
        event.location = self.location;
        event.latitude = self.latitude;
        event.longitude = self.longitude;
        event.image_path = self.image_path;
        event.max_participants = self.max_participants;
        event.start_time = self.start_time;
        event.end_time = self.end_time;
    }
}

fn check_details(
    name: &str,
    max_participants: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    now: DateTime<Utc>,
) -> Result<(), PlatformError> {
    let horizon = now
        .checked_add_months(Months::new(12))
        .ok_or_else(|| PlatformError::Internal("date overflow".to_string()))?;

    if name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if start_time < now {
        return Err(invalid("start time cannot be in the past"));
    }
    if start_time > horizon {
        return Err(invalid("start time must be within one year from now"));
    }
    if end_time <= start_time {
        return Err(invalid("end time must be after start time"));
    }
    if end_time > horizon {
        return Err(invalid("end time must be within one year from now"));
    }
    if max_participants < MIN_CAPACITY {
        return Err(invalid("max participants must be at least 2"));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(invalid("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid("longitude must be between -180 and 180"));
    }
    Ok(())
}

fn invalid(message: &str) -> PlatformError {
    PlatformError::ValidationError(message.to_string())
}
