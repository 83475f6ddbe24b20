//! Registration ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, RegistrationId, UserId};

/// Maximum accepted length of a registration comment, in characters.
pub const MAX_COMMENT_LEN: usize = 1_000;

/// Status of a live registration.
///
/// Cancelled registrations are removed from the ledger rather than kept
/// with a tombstone status, so `Registered` is the only stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// The user holds a reserved slot for the event.
    Registered,
}

impl RegistrationStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
        }
    }
}

/// One user's registration for one event.
///
/// At most one live record exists per `(event_id, user_id)` pair; the
/// ledger storage enforces this with a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Registration {
    /// Ledger identifier.
    pub id: RegistrationId,
    /// Event the user registered for.
    pub event_id: EventId,
    /// Registered user.
    pub user_id: UserId,
    /// Lifecycle status.
    pub status: RegistrationStatus,
    /// When the registration was committed.
    pub registration_time: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optional note left by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Input for inserting a ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    /// Event the user registered for.
    pub event_id: EventId,
    /// Registered user, always taken from the verified identity.
    pub user_id: UserId,
    /// Optional note left by the user.
    pub comment: Option<String>,
}
