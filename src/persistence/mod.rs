//! Persistence layer: capability traits plus in-memory and PostgreSQL
//! backends.
//!
//! [`EventStore`] is the capacity side's storage and the only place the
//! participant counter changes. [`RegistrationLedger`] is the
//! registration side's storage. The two are never handed to the same
//! component.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    Event, EventChanges, EventId, EventStatus, NewEvent, NewRegistration, Registration,
    RegistrationId, UserId,
};
use crate::error::PlatformError;

pub use memory::{InMemoryEventStore, InMemoryLedger};
pub use postgres::{PostgresEventStore, PostgresLedger};

/// Direction of a participant-count change together with its guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAdjustment {
    /// `+1`, applied only while the event is active and
    /// `participants < max_participants`.
    Claim,
    /// `-1`, applied only while `participants > 1` so the owner's implicit
    /// slot is never freed.
    Free,
}

/// Result of a conditional participant update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalUpdate {
    /// The guard held and the counter now has this value.
    Applied {
        /// Participant count after the update.
        participants: i32,
    },
    /// The guard failed; nothing was written.
    Rejected {
        /// Participant count observed when the guard was evaluated.
        participants: i32,
    },
    /// The event no longer takes registrations. Only a claim reports this.
    Closed,
    /// No event with that id exists.
    NotFound,
}

/// Result of an owner edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EventUpdate {
    /// The edit was stored.
    Applied(Box<Event>),
    /// The new capacity is below the participant count at write time.
    CapacityBelowParticipants {
        /// Participant count observed when the guard was evaluated.
        participants: i32,
    },
    /// No event with that id exists.
    NotFound,
}

/// Page window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows to skip.
    pub offset: u32,
    /// Maximum rows to return.
    pub limit: u32,
}

impl Page {
    /// Builds a window from a 1-indexed page number and page size.
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(per_page),
            limit: per_page,
        }
    }
}

/// Storage for events and their capacity counters.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Persists a validated event with `participants = 1`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn insert(&self, event: NewEvent) -> Result<Event, PlatformError>;

    /// Loads an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn load_by_id(&self, id: EventId) -> Result<Option<Event>, PlatformError>;

    /// Lists events ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn list(&self, page: Page) -> Result<(Vec<Event>, u64), PlatformError>;

    /// Atomically applies `adjustment` to the participant counter if its
    /// guard still holds at write time.
    ///
    /// Concurrent calls for the same event are serialized; calls for
    /// different events are independent.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn conditional_update_participants(
        &self,
        id: EventId,
        adjustment: SlotAdjustment,
    ) -> Result<ConditionalUpdate, PlatformError>;

    /// Overwrites the editable fields, provided the new capacity still
    /// covers the participant count at write time. Never touches
    /// `participants`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn update_details(
        &self,
        id: EventId,
        changes: EventChanges,
    ) -> Result<EventUpdate, PlatformError>;

    /// Sets the lifecycle status. Returns `None` if the event is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn set_status(
        &self,
        id: EventId,
        status: EventStatus,
    ) -> Result<Option<Event>, PlatformError>;
}

/// Storage for registration records, unique per `(event_id, user_id)`.
#[async_trait]
pub trait RegistrationLedger: Send + Sync + fmt::Debug {
    /// Finds the live registration for a pair.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn find_one(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Registration>, PlatformError>;

    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::DuplicateRegistration`] if the pair already
    /// has a record, or [`PlatformError::PersistenceError`] on storage
    /// failure.
    async fn insert(&self, registration: NewRegistration) -> Result<Registration, PlatformError>;

    /// Deletes a record by id. Returns `false` if nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn delete(&self, id: RegistrationId) -> Result<bool, PlatformError>;

    /// Puts back a record removed by [`RegistrationLedger::delete`], keeping
    /// its id, timestamps and comment.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::DuplicateRegistration`] if the pair has been
    /// registered again in the meantime, or
    /// [`PlatformError::PersistenceError`] on storage failure.
    async fn restore(&self, registration: &Registration) -> Result<(), PlatformError>;

    /// Lists a user's registrations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::PersistenceError`] on storage failure.
    async fn find_by_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<(Vec<Registration>, u64), PlatformError>;
}
