//! In-memory storage backends.
//!
//! [`InMemoryEventStore`] keeps every event behind its own
//! [`tokio::sync::Mutex`] inside an outer `RwLock<HashMap>`, so conditional
//! updates on one event serialize while different events proceed
//! concurrently. [`InMemoryLedger`] keeps records and a pair index under a
//! single lock so the uniqueness check and the insert are one step.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::{
    ConditionalUpdate, EventStore, EventUpdate, Page, RegistrationLedger, SlotAdjustment,
};
use crate::domain::{
    Event, EventChanges, EventId, EventStatus, NewEvent, NewRegistration, Registration,
    RegistrationId, RegistrationStatus, UserId,
};
use crate::error::PlatformError;

/// Event store backed by process memory.
///
/// # Concurrency
///
/// - Lookups take the outer read lock only long enough to clone the
///   per-event handle.
/// - Updates to the same event are serialized by its mutex.
/// - Updates to different events run in parallel.
#[derive(Debug)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<EventId, Arc<Mutex<Event>>>>,
    next_id: AtomicI64,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    async fn handle(&self, id: EventId) -> Option<Arc<Mutex<Event>>> {
        self.events.read().await.get(&id).map(Arc::clone)
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, PlatformError> {
        let id = EventId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now();
        let stored = Event {
            id,
            name: event.name,
            description: event.description,
            category: event.category,
            location: event.location,
            latitude: event.latitude,
            longitude: event.longitude,
            image_path: event.image_path,
            created_by: event.created_by,
            max_participants: event.max_participants,
            participants: 1,
            start_time: event.start_time,
            end_time: event.end_time,
            status: EventStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.events
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(stored.clone())));
        Ok(stored)
    }

    async fn load_by_id(&self, id: EventId) -> Result<Option<Event>, PlatformError> {
        let Some(handle) = self.handle(id).await else {
            return Ok(None);
        };
        let event = handle.lock().await.clone();
        Ok(Some(event))
    }

    async fn list(&self, page: Page) -> Result<(Vec<Event>, u64), PlatformError> {
        let mut handles: Vec<(EventId, Arc<Mutex<Event>>)> = {
            let map = self.events.read().await;
            map.iter().map(|(id, h)| (*id, Arc::clone(h))).collect()
        };
        let total = handles.len() as u64;
        handles.sort_by_key(|(id, _)| *id);

        let mut events = Vec::with_capacity(page.limit as usize);
        for (_, handle) in handles
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
        {
            events.push(handle.lock().await.clone());
        }
        Ok((events, total))
    }

    async fn conditional_update_participants(
        &self,
        id: EventId,
        adjustment: SlotAdjustment,
    ) -> Result<ConditionalUpdate, PlatformError> {
        let Some(handle) = self.handle(id).await else {
            return Ok(ConditionalUpdate::NotFound);
        };
        let mut event = handle.lock().await;

        if adjustment == SlotAdjustment::Claim && !event.is_open() {
            return Ok(ConditionalUpdate::Closed);
        }
        let allowed = match adjustment {
            SlotAdjustment::Claim => event.has_free_slot(),
            SlotAdjustment::Free => event.has_guest_slot(),
        };
        if !allowed {
            return Ok(ConditionalUpdate::Rejected {
                participants: event.participants,
            });
        }

        event.participants = match adjustment {
            SlotAdjustment::Claim => event.participants.saturating_add(1),
            SlotAdjustment::Free => event.participants.saturating_sub(1),
        };
        event.updated_at = Utc::now();

        Ok(ConditionalUpdate::Applied {
            participants: event.participants,
        })
    }

    async fn update_details(
        &self,
        id: EventId,
        changes: EventChanges,
    ) -> Result<EventUpdate, PlatformError> {
        let Some(handle) = self.handle(id).await else {
            return Ok(EventUpdate::NotFound);
        };
        let mut event = handle.lock().await;
        if changes.max_participants < event.participants {
            return Ok(EventUpdate::CapacityBelowParticipants {
                participants: event.participants,
            });
        }
        changes.apply_to(&mut event);
        event.updated_at = Utc::now();
        Ok(EventUpdate::Applied(Box::new(event.clone())))
    }

    async fn set_status(
        &self,
        id: EventId,
        status: EventStatus,
    ) -> Result<Option<Event>, PlatformError> {
        let Some(handle) = self.handle(id).await else {
            return Ok(None);
        };
        let mut event = handle.lock().await;
        event.status = status;
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }
}

#[derive(Debug, Default)]
struct LedgerIndex {
    records: HashMap<RegistrationId, Registration>,
    by_pair: HashMap<(EventId, UserId), RegistrationId>,
}

/// Registration ledger backed by process memory.
#[derive(Debug)]
pub struct InMemoryLedger {
    index: RwLock<LedgerIndex>,
    next_id: AtomicI64,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: RwLock::new(LedgerIndex::default()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Returns the number of live records.
    pub async fn len(&self) -> usize {
        self.index.read().await.records.len()
    }

    /// Returns `true` if the ledger holds no records.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.records.is_empty()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrationLedger for InMemoryLedger {
    async fn find_one(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Registration>, PlatformError> {
        let index = self.index.read().await;
        Ok(index
            .by_pair
            .get(&(event_id, user_id))
            .and_then(|id| index.records.get(id))
            .cloned())
    }

    async fn insert(&self, registration: NewRegistration) -> Result<Registration, PlatformError> {
        let mut index = self.index.write().await;
        let pair = (registration.event_id, registration.user_id);
        if index.by_pair.contains_key(&pair) {
            return Err(PlatformError::DuplicateRegistration {
                event_id: registration.event_id,
                user_id: registration.user_id,
            });
        }

        let id = RegistrationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now();
        let record = Registration {
            id,
            event_id: registration.event_id,
            user_id: registration.user_id,
            status: RegistrationStatus::Registered,
            registration_time: now,
            updated_at: now,
            comment: registration.comment,
        };
        index.by_pair.insert(pair, id);
        index.records.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: RegistrationId) -> Result<bool, PlatformError> {
        let mut index = self.index.write().await;
        let Some(record) = index.records.remove(&id) else {
            return Ok(false);
        };
        index.by_pair.remove(&(record.event_id, record.user_id));
        Ok(true)
    }

    async fn restore(&self, registration: &Registration) -> Result<(), PlatformError> {
        let mut index = self.index.write().await;
        let pair = (registration.event_id, registration.user_id);
        if index.by_pair.contains_key(&pair) || index.records.contains_key(&registration.id) {
            return Err(PlatformError::DuplicateRegistration {
                event_id: registration.event_id,
                user_id: registration.user_id,
            });
        }
        index.by_pair.insert(pair, registration.id);
        index.records.insert(registration.id, registration.clone());
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<(Vec<Registration>, u64), PlatformError> {
        let index = self.index.read().await;
        let mut mine: Vec<Registration> = index
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        let total = mine.len() as u64;
        mine.sort_by(|a, b| b.registration_time.cmp(&a.registration_time).then(b.id.cmp(&a.id)));
        let data = mine
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok((data, total))
    }
}
