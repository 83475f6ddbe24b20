//! Capacity service: event catalogue plus the reserve/release operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{Event, EventChanges, EventId, EventStatus, Identity, NewEvent};
use crate::error::PlatformError;
use crate::persistence::{ConditionalUpdate, EventStore, EventUpdate, Page, SlotAdjustment};
use crate::rpc::{ReleaseReply, ReleaseStatus, ReserveReply, ReserveStatus};

/// Fields a caller supplies when creating or editing an event.
#[derive(Debug, Clone)]
pub struct EventInput {
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
    /// Capacity including the creator.
    pub max_participants: i32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
}

/// Owner of every event's occupancy counter.
///
/// `reserve_slot` and `release_slot` never return `Err`: every outcome,
/// including storage failure, is reported in the reply status so that it
/// can cross the wire unchanged.
#[derive(Debug, Clone)]
pub struct CapacityService {
    store: Arc<dyn EventStore>,
}

impl CapacityService {
    /// Creates a new `CapacityService`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Validates and stores a new event owned by `owner`. The owner takes
    /// the first slot.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unauthorized`] for an unusable identity,
    /// [`PlatformError::ValidationError`] if a field rule fails, or a
    /// persistence error.
    pub async fn create_event(
        &self,
        owner: &Identity,
        input: EventInput,
    ) -> Result<Event, PlatformError> {
        if !owner.is_well_formed() {
            return Err(PlatformError::Unauthorized(
                "identity lacks user id or username".to_string(),
            ));
        }

        let new_event = NewEvent {
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            location: input.location,
            latitude: input.latitude,
            longitude: input.longitude,
            image_path: input.image_path,
            created_by: owner.username.trim().to_string(),
            max_participants: input.max_participants,
            start_time: input.start_time,
            end_time: input.end_time,
        };
        new_event.validate(Utc::now())?;

        let event = self.store.insert(new_event).await?;
        tracing::info!(
            event_id = %event.id,
            owner = %event.created_by,
            max_participants = event.max_participants,
            "event created"
        );
        Ok(event)
    }

    /// Replaces the editable fields of an event owned by `owner`.
    ///
    /// The participant count is left alone, and the new capacity must still
    /// cover it.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Unauthorized`] for an unusable identity.
    /// - [`PlatformError::EventNotFound`] if the event does not exist.
    /// - [`PlatformError::Forbidden`] if the caller is not the owner.
    /// - [`PlatformError::ValidationError`] if a field rule fails, the event
    ///   is cancelled, or the capacity is below the current participants.
    pub async fn update_event(
        &self,
        owner: &Identity,
        id: EventId,
        input: EventInput,
    ) -> Result<Event, PlatformError> {
        let event = self.owned_event(owner, id).await?;
        if !event.is_open() {
            return Err(PlatformError::ValidationError(
                "a cancelled event cannot be edited".to_string(),
            ));
        }

        let changes = EventChanges {
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            location: input.location,
            latitude: input.latitude,
            longitude: input.longitude,
            image_path: input.image_path,
            max_participants: input.max_participants,
            start_time: input.start_time,
            end_time: input.end_time,
        };
        changes.validate(Utc::now())?;

        match self.store.update_details(id, changes).await? {
            EventUpdate::Applied(event) => {
                tracing::info!(
                    event_id = %id,
                    owner = %event.created_by,
                    max_participants = event.max_participants,
                    participants = event.participants,
                    "event updated"
                );
                Ok(*event)
            }
            EventUpdate::CapacityBelowParticipants { participants } => {
                Err(PlatformError::ValidationError(format!(
                    "max participants cannot be below the current {participants} participants"
                )))
            }
            EventUpdate::NotFound => Err(PlatformError::EventNotFound(id)),
        }
    }

    /// Marks an event owned by `owner` as cancelled. Further reservations
    /// are refused; releases keep working so guests can still leave.
    /// Cancelling twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unauthorized`], [`PlatformError::EventNotFound`]
    /// or [`PlatformError::Forbidden`] as for [`CapacityService::update_event`].
    pub async fn cancel_event(&self, owner: &Identity, id: EventId) -> Result<Event, PlatformError> {
        let event = self.owned_event(owner, id).await?;
        if !event.is_open() {
            return Ok(event);
        }

        let event = self
            .store
            .set_status(id, EventStatus::Cancelled)
            .await?
            .ok_or(PlatformError::EventNotFound(id))?;
        tracing::info!(
            event_id = %id,
            owner = %event.created_by,
            participants = event.participants,
            "event cancelled"
        );
        Ok(event)
    }

    async fn owned_event(&self, owner: &Identity, id: EventId) -> Result<Event, PlatformError> {
        if !owner.is_well_formed() {
            return Err(PlatformError::Unauthorized(
                "identity lacks user id or username".to_string(),
            ));
        }
        let event = self.get_event(id).await?;
        if !event.is_owned_by(&owner.username) {
            return Err(PlatformError::Forbidden(format!(
                "event {id} belongs to another user"
            )));
        }
        Ok(event)
    }

    /// Returns a single event.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::EventNotFound`] if it does not exist.
    pub async fn get_event(&self, id: EventId) -> Result<Event, PlatformError> {
        self.store
            .load_by_id(id)
            .await?
            .ok_or(PlatformError::EventNotFound(id))
    }

    /// Returns a page of events and the total count.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    pub async fn list_events(&self, page: Page) -> Result<(Vec<Event>, u64), PlatformError> {
        self.store.list(page).await
    }

    /// `ReserveSlot`: claims one slot unless the caller owns the event or it
    /// is full. A cancelled event is reported as `EVENT_NOT_FOUND`.
    ///
    /// The capacity check and the increment are a single conditional update
    /// in the store, so concurrent callers cannot overshoot the limit.
    pub async fn reserve_slot(&self, event_id: EventId, caller_identity: &str) -> ReserveReply {
        let event = match self.store.load_by_id(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => return ReserveReply::failed(ReserveStatus::EventNotFound),
            Err(e) => {
                tracing::error!(%event_id, error = %e, "reserve: failed to load event");
                return ReserveReply::failed(ReserveStatus::InternalError);
            }
        };

        if !event.is_open() {
            tracing::debug!(%event_id, caller = caller_identity, "reserve on cancelled event");
            return ReserveReply::failed(ReserveStatus::EventNotFound);
        }
        if event.is_owned_by(caller_identity) {
            return ReserveReply::failed(ReserveStatus::CallerIsOwner);
        }

        match self
            .store
            .conditional_update_participants(event_id, SlotAdjustment::Claim)
            .await
        {
            Ok(ConditionalUpdate::Applied { participants }) => {
                tracing::info!(%event_id, caller = caller_identity, participants, "slot reserved");
                ReserveReply::success(participants)
            }
            Ok(ConditionalUpdate::Rejected { participants }) => {
                tracing::debug!(%event_id, caller = caller_identity, participants, "event full");
                ReserveReply::failed(ReserveStatus::EventFull)
            }
            Ok(ConditionalUpdate::Closed | ConditionalUpdate::NotFound) => {
                ReserveReply::failed(ReserveStatus::EventNotFound)
            }
            Err(e) => {
                tracing::error!(%event_id, error = %e, "reserve: conditional update failed");
                ReserveReply::failed(ReserveStatus::InternalError)
            }
        }
    }

    /// `ReleaseSlot`: frees one slot. Owners and events with only the owner
    /// left get `NO_OP`.
    pub async fn release_slot(&self, event_id: EventId, caller_identity: &str) -> ReleaseReply {
        let status = match self.store.load_by_id(event_id).await {
            Ok(Some(event)) if event.is_owned_by(caller_identity) => ReleaseStatus::NoOp,
            Ok(Some(_)) => self.free_one(event_id, caller_identity).await,
            Ok(None) => ReleaseStatus::EventNotFound,
            Err(e) => {
                tracing::error!(%event_id, error = %e, "release: failed to load event");
                ReleaseStatus::InternalError
            }
        };
        ReleaseReply { status }
    }

    async fn free_one(&self, event_id: EventId, caller_identity: &str) -> ReleaseStatus {
        match self
            .store
            .conditional_update_participants(event_id, SlotAdjustment::Free)
            .await
        {
            Ok(ConditionalUpdate::Applied { participants }) => {
                tracing::info!(%event_id, caller = caller_identity, participants, "slot released");
                ReleaseStatus::Success
            }
            Ok(ConditionalUpdate::Rejected { .. } | ConditionalUpdate::Closed) => {
                ReleaseStatus::NoOp
            }
            Ok(ConditionalUpdate::NotFound) => ReleaseStatus::EventNotFound,
            Err(e) => {
                tracing::error!(%event_id, error = %e, "release: conditional update failed");
                ReleaseStatus::InternalError
            }
        }
    }
}
