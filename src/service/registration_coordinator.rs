//! Registration coordinator: sequences the remote slot reservation and the
//! local ledger write for one logical registration or cancellation.
//!
//! There is no transaction spanning the capacity service and the ledger.
//! The reservation is treated as the source of truth for capacity; a ledger
//! failure after a successful reservation triggers an inline compensating
//! release, and a failed compensation is surfaced as
//! [`PlatformError::Inconsistent`] and logged for reconciliation.
//!
//! ```text
//! UNREGISTERED ──create: reserve ok, insert ok──▶ REGISTERED
//! REGISTERED   ──delete: delete ok, release ok──▶ UNREGISTERED
//! REGISTERED   ──delete: delete ok, release failed, restore ok──▶ REGISTERED
//! ```

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::registration::MAX_COMMENT_LEN;
use crate::domain::{EventId, Identity, NewRegistration, Registration};
use crate::error::PlatformError;
use crate::persistence::{Page, RegistrationLedger};
use crate::rpc::{CapacityClient, ReleaseReply, ReleaseStatus, ReserveReply, ReserveStatus, RpcError};

/// Client request to register for an event.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Target event.
    pub event_id: EventId,
    /// Optional note.
    pub comment: Option<String>,
}

/// Orchestrates registration creation and cancellation.
///
/// Stateless apart from its collaborators: the ledger it owns and a client
/// for the remote capacity service. Compensation runs inline on the same
/// task, so two compensations for one registration never overlap.
#[derive(Debug, Clone)]
pub struct RegistrationCoordinator {
    ledger: Arc<dyn RegistrationLedger>,
    capacity: Arc<dyn CapacityClient>,
    rpc_timeout: Duration,
}

impl RegistrationCoordinator {
    /// Creates a coordinator. `rpc_timeout` bounds every capacity call.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn RegistrationLedger>,
        capacity: Arc<dyn CapacityClient>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            capacity,
            rpc_timeout,
        }
    }

    /// Registers the caller for an event.
    ///
    /// The user id always comes from `identity`; the request carries none.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Unauthorized`] for an unusable identity.
    /// - [`PlatformError::ValidationError`] for a bad event id or comment.
    /// - [`PlatformError::DuplicateRegistration`] if already registered.
    /// - [`PlatformError::OwnerCannotRegister`], [`PlatformError::EventNotFound`],
    ///   [`PlatformError::EventFull`] from the reservation outcome. A full
    ///   event is reported as a duplicate if the caller got registered
    ///   concurrently.
    /// - [`PlatformError::Internal`] if the capacity call failed or timed
    ///   out; nothing is written to the ledger.
    /// - [`PlatformError::Inconsistent`] if the ledger insert failed and the
    ///   compensating release failed too.
    pub async fn create(
        &self,
        identity: &Identity,
        request: RegistrationRequest,
    ) -> Result<Registration, PlatformError> {
        let user_id = checked_identity(identity)?.user_id;
        let event_id = request.event_id;
        validate_request(&request)?;

        if self.ledger.find_one(event_id, user_id).await?.is_some() {
            return Err(PlatformError::DuplicateRegistration { event_id, user_id });
        }

        let attempt_id = Uuid::new_v4();
        let reply = match self.reserve(event_id, &identity.username).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    %attempt_id, %event_id, %user_id,
                    operation = "create",
                    remote_outcome = "unknown",
                    error = %e,
                    "reserve call failed; no registration written"
                );
                return Err(PlatformError::Internal(format!(
                    "capacity service unavailable: {e}"
                )));
            }
        };

        match reply.status {
            ReserveStatus::Success => {}
            ReserveStatus::CallerIsOwner => return Err(PlatformError::OwnerCannotRegister(event_id)),
            ReserveStatus::EventNotFound => return Err(PlatformError::EventNotFound(event_id)),
            ReserveStatus::EventFull => {
                // A concurrent create by the same user may have taken the
                // last slot; report that as the duplicate it is.
                if self.ledger.find_one(event_id, user_id).await?.is_some() {
                    return Err(PlatformError::DuplicateRegistration { event_id, user_id });
                }
                return Err(PlatformError::EventFull(event_id));
            }
            ReserveStatus::InternalError => {
                tracing::error!(
                    %attempt_id, %event_id, %user_id,
                    operation = "create",
                    remote_outcome = "INTERNAL_ERROR",
                    "capacity service failed to reserve"
                );
                return Err(PlatformError::Internal(
                    "capacity service failed to reserve a slot".to_string(),
                ));
            }
        }

        let new_registration = NewRegistration {
            event_id,
            user_id,
            comment: request.comment,
        };
        match self.ledger.insert(new_registration).await {
            Ok(registration) => {
                tracing::info!(
                    %attempt_id, %event_id, %user_id,
                    registration_id = %registration.id,
                    participants = reply.current_participants,
                    "registration created"
                );
                Ok(registration)
            }
            Err(insert_err) => {
                self.compensate(attempt_id, identity, event_id, insert_err)
                    .await
            }
        }
    }

    /// Cancels the caller's registration for an event.
    ///
    /// The ledger record is removed before the slot is released. Only the
    /// caller whose delete actually removed the record goes on to release,
    /// so concurrent cancellations of one registration free one slot. If
    /// the release then fails, the record is put back.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Unauthorized`] for an unusable identity.
    /// - [`PlatformError::NotRegistered`] if there is nothing to cancel,
    ///   including when a concurrent cancellation removed it first.
    /// - [`PlatformError::Forbidden`] if the stored record names another user.
    /// - [`PlatformError::EventNotFound`] from the release outcome; the
    ///   record is restored.
    /// - [`PlatformError::Internal`] if the release failed; the record is
    ///   restored so the user stays counted.
    /// - [`PlatformError::Inconsistent`] if the release failed and the record
    ///   could not be restored.
    pub async fn delete(&self, identity: &Identity, event_id: EventId) -> Result<(), PlatformError> {
        let user_id = checked_identity(identity)?.user_id;
        if !event_id.is_valid() {
            return Err(PlatformError::ValidationError(
                "event_id must be a positive integer".to_string(),
            ));
        }

        let Some(registration) = self.ledger.find_one(event_id, user_id).await? else {
            return Err(PlatformError::NotRegistered(event_id));
        };
        if registration.user_id != user_id {
            return Err(PlatformError::Forbidden(format!(
                "registration {} belongs to another user",
                registration.id
            )));
        }

        if !self.ledger.delete(registration.id).await? {
            tracing::debug!(
                %event_id, %user_id,
                registration_id = %registration.id,
                "registration already removed by a concurrent cancellation"
            );
            return Err(PlatformError::NotRegistered(event_id));
        }

        let attempt_id = Uuid::new_v4();
        let failure = match self.release(event_id, &identity.username).await {
            Ok(ReleaseReply {
                status: status @ (ReleaseStatus::Success | ReleaseStatus::NoOp),
            }) => {
                tracing::info!(
                    %attempt_id, %event_id, %user_id,
                    remote_outcome = ?status,
                    "registration cancelled"
                );
                return Ok(());
            }
            Ok(ReleaseReply {
                status: ReleaseStatus::EventNotFound,
            }) => PlatformError::EventNotFound(event_id),
            Ok(ReleaseReply {
                status: ReleaseStatus::InternalError,
            }) => {
                tracing::error!(
                    %attempt_id, %event_id, %user_id,
                    operation = "delete",
                    remote_outcome = "INTERNAL_ERROR",
                    "capacity service failed to release"
                );
                PlatformError::Internal("capacity service failed to release the slot".to_string())
            }
            Err(e) => {
                tracing::error!(
                    %attempt_id, %event_id, %user_id,
                    operation = "delete",
                    remote_outcome = "unknown",
                    error = %e,
                    "release call failed"
                );
                PlatformError::Internal(format!("capacity service unavailable: {e}"))
            }
        };

        match self.ledger.restore(&registration).await {
            Ok(()) => {
                tracing::warn!(
                    %attempt_id, %event_id, %user_id,
                    registration_id = %registration.id,
                    error = %failure,
                    "slot not released; registration restored"
                );
                Err(failure)
            }
            Err(restore_err) => {
                tracing::error!(
                    %attempt_id, %event_id, %user_id,
                    registration_id = %registration.id,
                    operation = "delete",
                    release_error = %failure,
                    error = %restore_err,
                    "slot not released and registration could not be restored; needs reconciliation"
                );
                Err(PlatformError::Inconsistent(format!(
                    "registration {} on event {event_id} removed but its slot is still held \
                     ({failure})",
                    registration.id
                )))
            }
        }
    }

    /// Lists the caller's registrations.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unauthorized`] for an unusable identity, or a
    /// persistence error.
    pub async fn list_mine(
        &self,
        identity: &Identity,
        page: Page,
    ) -> Result<(Vec<Registration>, u64), PlatformError> {
        let user_id = checked_identity(identity)?.user_id;
        self.ledger.find_by_user(user_id, page).await
    }

    async fn reserve(&self, event_id: EventId, caller: &str) -> Result<ReserveReply, RpcError> {
        tokio::time::timeout(self.rpc_timeout, self.capacity.reserve_slot(event_id, caller))
            .await
            .map_err(|_| RpcError::Timeout(self.timeout_ms()))?
    }

    async fn release(&self, event_id: EventId, caller: &str) -> Result<ReleaseReply, RpcError> {
        tokio::time::timeout(self.rpc_timeout, self.capacity.release_slot(event_id, caller))
            .await
            .map_err(|_| RpcError::Timeout(self.timeout_ms()))?
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.rpc_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Undoes a successful reservation after the ledger insert failed.
    ///
    /// Returns the insert error when the slot was given back, or
    /// [`PlatformError::Inconsistent`] when it could not be.
    async fn compensate(
        &self,
        attempt_id: Uuid,
        identity: &Identity,
        event_id: EventId,
        insert_err: PlatformError,
    ) -> Result<Registration, PlatformError> {
        let user_id = identity.user_id;
        tracing::warn!(
            %attempt_id, %event_id, %user_id,
            operation = "create",
            error = %insert_err,
            "ledger insert failed after reservation; releasing slot"
        );

        let released = match self.release(event_id, &identity.username).await {
            Ok(ReleaseReply {
                status: ReleaseStatus::Success,
            }) => Ok(()),
            Ok(reply) => Err(format!("{:?}", reply.status)),
            Err(e) => Err(e.to_string()),
        };

        match released {
            Ok(()) => {
                tracing::info!(%attempt_id, %event_id, %user_id, "compensating release succeeded");
                if insert_err.is_client_error() {
                    Err(insert_err)
                } else {
                    Err(PlatformError::Internal(format!(
                        "failed to record registration: {insert_err}"
                    )))
                }
            }
            Err(outcome) => {
                tracing::error!(
                    %attempt_id, %event_id, %user_id,
                    operation = "create",
                    remote_outcome = %outcome,
                    insert_error = %insert_err,
                    "compensating release failed; slot is orphaned and needs reconciliation"
                );
                Err(PlatformError::Inconsistent(format!(
                    "slot reserved on event {event_id} for user {user_id} but not recorded \
                     ({insert_err}); release returned {outcome}"
                )))
            }
        }
    }
}

fn checked_identity(identity: &Identity) -> Result<&Identity, PlatformError> {
    if identity.is_well_formed() {
        Ok(identity)
    } else {
        Err(PlatformError::Unauthorized(
            "identity lacks user id or username".to_string(),
        ))
    }
}

fn validate_request(request: &RegistrationRequest) -> Result<(), PlatformError> {
    if !request.event_id.is_valid() {
        return Err(PlatformError::ValidationError(
            "event_id must be a positive integer".to_string(),
        ));
    }
    if let Some(comment) = &request.comment
        && comment.chars().count() > MAX_COMMENT_LEN
    {
        return Err(PlatformError::ValidationError(format!(
            "comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    use async_trait::async_trait;
    use futures_util::future::join_all;

    use super::*;
    use crate::domain::{NewRegistration, RegistrationId, UserId};
    use crate::persistence::{InMemoryEventStore, InMemoryLedger};
    use crate::rpc::LocalCapacityClient;
    use crate::service::CapacityService;
    use crate::service::capacity_service::tests::{alice, event_input};

    struct Stack {
        capacity: Arc<CapacityService>,
        ledger: Arc<InMemoryLedger>,
        coordinator: RegistrationCoordinator,
        event_id: EventId,
    }

    async fn stack(max_participants: i32) -> Stack {
        stack_with(max_participants, |capacity| -> Arc<dyn CapacityClient> {
            Arc::new(LocalCapacityClient::new(capacity))
        })
        .await
    }

    async fn stack_with(
        max_participants: i32,
        client: impl FnOnce(Arc<CapacityService>) -> Arc<dyn CapacityClient>,
    ) -> Stack {
        let capacity = Arc::new(CapacityService::new(Arc::new(InMemoryEventStore::new())));
        let Ok(event) = capacity
            .create_event(&alice(), event_input(max_participants))
            .await
        else {
            panic!("event creation failed");
        };
        let ledger = Arc::new(InMemoryLedger::new());
        let coordinator = RegistrationCoordinator::new(
            Arc::clone(&ledger) as Arc<dyn RegistrationLedger>,
            client(Arc::clone(&capacity)),
            Duration::from_secs(1),
        );
        Stack {
            capacity,
            ledger,
            coordinator,
            event_id: event.id,
        }
    }

    impl Stack {
        async fn participants(&self) -> i32 {
            let Ok(event) = self.capacity.get_event(self.event_id).await else {
                panic!("event not found");
            };
            event.participants
        }

        fn request(&self) -> RegistrationRequest {
            RegistrationRequest {
                event_id: self.event_id,
                comment: None,
            }
        }
    }

    fn user(id: i64, name: &str) -> Identity {
        Identity::new(UserId::new(id), name)
    }

    #[tokio::test]
    async fn create_reserves_and_records() {
        let s = stack(3).await;
        let bob = user(2, "bob");

        let Ok(registration) = s.coordinator.create(&bob, s.request()).await else {
            panic!("registration failed");
        };
        assert_eq!(registration.user_id, bob.user_id);
        assert_eq!(registration.event_id, s.event_id);
        assert_eq!(s.participants().await, 2);
        assert_eq!(s.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn second_create_is_duplicate_and_keeps_capacity() {
        let s = stack(5).await;
        let bob = user(2, "bob");
        let _ = s.coordinator.create(&bob, s.request()).await;

        let again = s.coordinator.create(&bob, s.request()).await;
        assert!(matches!(
            again,
            Err(PlatformError::DuplicateRegistration { .. })
        ));
        assert_eq!(s.participants().await, 2);
    }

    #[tokio::test]
    async fn owner_cannot_register() {
        let s = stack(5).await;
        let result = s.coordinator.create(&alice(), s.request()).await;
        assert!(matches!(result, Err(PlatformError::OwnerCannotRegister(_))));
        assert_eq!(s.participants().await, 1);
        assert!(s.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_event_is_reported() {
        let s = stack(5).await;
        let request = RegistrationRequest {
            event_id: EventId::new(999),
            comment: None,
        };
        let result = s.coordinator.create(&user(2, "bob"), request).await;
        assert!(matches!(result, Err(PlatformError::EventNotFound(_))));
        assert!(s.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_identity_is_unauthorized() {
        let s = stack(5).await;
        let result = s.coordinator.create(&user(0, "ghost"), s.request()).await;
        assert!(matches!(result, Err(PlatformError::Unauthorized(_))));

        let result = s.coordinator.create(&user(4, "  "), s.request()).await;
        assert!(matches!(result, Err(PlatformError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn oversized_comment_is_rejected() {
        let s = stack(5).await;
        let request = RegistrationRequest {
            event_id: s.event_id,
            comment: Some("x".repeat(MAX_COMMENT_LEN + 1)),
        };
        let result = s.coordinator.create(&user(2, "bob"), request).await;
        assert!(matches!(result, Err(PlatformError::ValidationError(_))));
        assert_eq!(s.participants().await, 1);
    }

    #[tokio::test]
    async fn capacity_scenario_with_cancellation() {
        let s = stack(2).await;
        let bob = user(2, "bob");
        let carol = user(3, "carol");

        assert!(s.coordinator.create(&bob, s.request()).await.is_ok());
        assert_eq!(s.participants().await, 2);

        let full = s.coordinator.create(&carol, s.request()).await;
        assert!(matches!(full, Err(PlatformError::EventFull(_))));
        assert_eq!(s.participants().await, 2);

        assert!(s.coordinator.delete(&bob, s.event_id).await.is_ok());
        assert_eq!(s.participants().await, 1);

        assert!(s.coordinator.create(&carol, s.request()).await.is_ok());
        assert_eq!(s.participants().await, 2);
    }

    #[tokio::test]
    async fn delete_then_create_restores_count() {
        let s = stack(4).await;
        let bob = user(2, "bob");
        let _ = s.coordinator.create(&bob, s.request()).await;
        let _ = s.coordinator.create(&user(3, "carol"), s.request()).await;
        let before = s.participants().await;

        assert!(s.coordinator.delete(&bob, s.event_id).await.is_ok());
        assert_eq!(s.participants().await, before - 1);
        assert!(s.coordinator.create(&bob, s.request()).await.is_ok());
        assert_eq!(s.participants().await, before);
    }

    #[tokio::test]
    async fn delete_without_registration_is_not_registered() {
        let s = stack(4).await;
        let result = s.coordinator.delete(&user(2, "bob"), s.event_id).await;
        assert!(matches!(result, Err(PlatformError::NotRegistered(_))));
        assert_eq!(s.participants().await, 1);
    }

    #[tokio::test]
    async fn concurrent_distinct_users_fill_exactly_to_capacity() {
        let s = Arc::new(stack(6).await);

        let attempts = (10..40).map(|n| {
            let s = Arc::clone(&s);
            tokio::spawn(async move {
                let who = user(n, &format!("user-{n}"));
                s.coordinator.create(&who, s.request()).await
            })
        });
        let results = join_all(attempts).await;

        let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(PlatformError::EventFull(_)))))
            .count();
        assert_eq!(ok, 5);
        assert_eq!(full, 25);
        assert_eq!(s.participants().await, 6);
        assert_eq!(s.ledger.len().await, 5);
    }

    #[tokio::test]
    async fn concurrent_same_user_registers_once() {
        let s = Arc::new(stack(10).await);

        let attempts = (0..8).map(|_| {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.coordinator.create(&user(2, "bob"), s.request()).await })
        });
        let results = join_all(attempts).await;

        let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        assert_eq!(ok, 1);
        assert_eq!(s.ledger.len().await, 1);
        // Losing racers reserved and then compensated.
        assert_eq!(s.participants().await, 2);
    }

    /// Local client that waits before every call, widening race windows.
    #[derive(Debug)]
    struct SlowCapacity {
        inner: LocalCapacityClient,
        latency: Duration,
    }

    #[async_trait]
    impl CapacityClient for SlowCapacity {
        async fn reserve_slot(
            &self,
            event_id: EventId,
            caller: &str,
        ) -> Result<ReserveReply, RpcError> {
            tokio::time::sleep(self.latency).await;
            self.inner.reserve_slot(event_id, caller).await
        }

        async fn release_slot(
            &self,
            event_id: EventId,
            caller: &str,
        ) -> Result<ReleaseReply, RpcError> {
            tokio::time::sleep(self.latency).await;
            self.inner.release_slot(event_id, caller).await
        }
    }

    async fn slow_stack(max_participants: i32) -> Stack {
        stack_with(max_participants, |capacity| -> Arc<dyn CapacityClient> {
            Arc::new(SlowCapacity {
                inner: LocalCapacityClient::new(capacity),
                latency: Duration::from_millis(5),
            })
        })
        .await
    }

    #[tokio::test]
    async fn concurrent_cancels_release_one_slot() {
        let s = slow_stack(3).await;
        let bob = user(2, "bob");
        assert!(s.coordinator.create(&bob, s.request()).await.is_ok());
        assert!(s.coordinator.create(&user(3, "carol"), s.request()).await.is_ok());
        assert_eq!(s.participants().await, 3);

        let (first, second) = tokio::join!(
            s.coordinator.delete(&bob, s.event_id),
            s.coordinator.delete(&bob, s.event_id),
        );
        let cancelled = [&first, &second].iter().filter(|r| r.is_ok()).count();
        let missing = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(PlatformError::NotRegistered(_))))
            .count();
        assert_eq!(cancelled, 1);
        assert_eq!(missing, 1);
        assert_eq!(s.participants().await, 2);
        assert_eq!(s.ledger.len().await, 1);

        // One seat is left for the owner, carol and one newcomer.
        let dave = user(4, "dave");
        let erin = user(5, "erin");
        let (dave_result, erin_result) = tokio::join!(
            s.coordinator.create(&dave, s.request()),
            s.coordinator.create(&erin, s.request()),
        );
        let admitted = [dave_result.is_ok(), erin_result.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(s.participants().await, 3);
        assert_eq!(s.ledger.len().await, 2);
    }

    #[tokio::test]
    async fn repeated_cancel_after_success_is_not_registered() {
        let s = slow_stack(3).await;
        let bob = user(2, "bob");
        assert!(s.coordinator.create(&bob, s.request()).await.is_ok());

        assert!(s.coordinator.delete(&bob, s.event_id).await.is_ok());
        let again = s.coordinator.delete(&bob, s.event_id).await;
        assert!(matches!(again, Err(PlatformError::NotRegistered(_))));
        assert_eq!(s.participants().await, 1);
    }

    // ── Fault injection ───────────────────────────────────────────────

    #[derive(Debug)]
    enum Scripted<T> {
        Reply(T),
        Fail,
        Hang,
    }

    #[derive(Debug)]
    struct ScriptedCapacity {
        reserve: Scripted<ReserveReply>,
        release: Scripted<ReleaseReply>,
        release_calls: Mutex<u32>,
    }

    impl ScriptedCapacity {
        fn new(reserve: Scripted<ReserveReply>, release: Scripted<ReleaseReply>) -> Self {
            Self {
                reserve,
                release,
                release_calls: Mutex::new(0),
            }
        }

        fn release_calls(&self) -> u32 {
            self.release_calls.lock().map(|n| *n).unwrap_or(0)
        }
    }

    async fn play<T: Copy>(script: &Scripted<T>) -> Result<T, RpcError> {
        match script {
            Scripted::Reply(reply) => Ok(*reply),
            Scripted::Fail => Err(RpcError::Transport("connection refused".to_string())),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(RpcError::Transport("unreachable".to_string()))
            }
        }
    }

    #[async_trait]
    impl CapacityClient for ScriptedCapacity {
        async fn reserve_slot(&self, _: EventId, _: &str) -> Result<ReserveReply, RpcError> {
            play(&self.reserve).await
        }

        async fn release_slot(&self, _: EventId, _: &str) -> Result<ReleaseReply, RpcError> {
            if let Ok(mut n) = self.release_calls.lock() {
                *n += 1;
            }
            play(&self.release).await
        }
    }

    /// Ledger whose writes fail with a storage error.
    #[derive(Debug, Default)]
    struct FaultyLedger {
        inner: InMemoryLedger,
        fail_insert: bool,
        fail_delete: bool,
        fail_restore: bool,
    }

    #[async_trait]
    impl RegistrationLedger for FaultyLedger {
        async fn find_one(
            &self,
            event_id: EventId,
            user_id: UserId,
        ) -> Result<Option<Registration>, PlatformError> {
            self.inner.find_one(event_id, user_id).await
        }

        async fn insert(&self, r: NewRegistration) -> Result<Registration, PlatformError> {
            if self.fail_insert {
                return Err(PlatformError::PersistenceError("disk full".to_string()));
            }
            self.inner.insert(r).await
        }

        async fn delete(&self, id: RegistrationId) -> Result<bool, PlatformError> {
            if self.fail_delete {
                return Err(PlatformError::PersistenceError("disk full".to_string()));
            }
            self.inner.delete(id).await
        }

        async fn restore(&self, r: &Registration) -> Result<(), PlatformError> {
            if self.fail_restore {
                return Err(PlatformError::PersistenceError("disk full".to_string()));
            }
            self.inner.restore(r).await
        }

        async fn find_by_user(
            &self,
            user_id: UserId,
            page: Page,
        ) -> Result<(Vec<Registration>, u64), PlatformError> {
            self.inner.find_by_user(user_id, page).await
        }
    }

    fn coordinator(
        ledger: Arc<dyn RegistrationLedger>,
        capacity: Arc<ScriptedCapacity>,
    ) -> RegistrationCoordinator {
        RegistrationCoordinator::new(ledger, capacity, Duration::from_millis(100))
    }

    fn request(id: i64) -> RegistrationRequest {
        RegistrationRequest {
            event_id: EventId::new(id),
            comment: Some("see you there".to_string()),
        }
    }

    fn bob_on_event_one() -> NewRegistration {
        NewRegistration {
            event_id: EventId::new(1),
            user_id: UserId::new(2),
            comment: None,
        }
    }

    fn ok_release() -> Scripted<ReleaseReply> {
        Scripted::Reply(ReleaseReply {
            status: ReleaseStatus::Success,
        })
    }

    #[tokio::test]
    async fn transport_failure_writes_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let capacity = Arc::new(ScriptedCapacity::new(Scripted::Fail, ok_release()));
        let c = coordinator(Arc::clone(&ledger) as Arc<dyn RegistrationLedger>, capacity);

        let result = c.create(&user(2, "bob"), request(1)).await;
        assert!(matches!(result, Err(PlatformError::Internal(_))));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn timeout_writes_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let capacity = Arc::new(ScriptedCapacity::new(Scripted::Hang, ok_release()));
        let c = coordinator(Arc::clone(&ledger) as Arc<dyn RegistrationLedger>, capacity);

        let result = c.create(&user(2, "bob"), request(1)).await;
        assert!(matches!(result, Err(PlatformError::Internal(_))));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn remote_internal_error_writes_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::failed(ReserveStatus::InternalError)),
            ok_release(),
        ));
        let c = coordinator(Arc::clone(&ledger) as Arc<dyn RegistrationLedger>, capacity);

        let result = c.create(&user(2, "bob"), request(1)).await;
        assert!(matches!(result, Err(PlatformError::Internal(_))));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn failed_insert_is_compensated() {
        let ledger = Arc::new(FaultyLedger {
            fail_insert: true,
            ..FaultyLedger::default()
        });
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            ok_release(),
        ));
        let c = coordinator(ledger, Arc::clone(&capacity));

        let result = c.create(&user(2, "bob"), request(1)).await;
        assert!(matches!(result, Err(PlatformError::Internal(_))));
        assert_eq!(capacity.release_calls(), 1);
    }

    #[tokio::test]
    async fn failed_compensation_is_inconsistent() {
        let ledger = Arc::new(FaultyLedger {
            fail_insert: true,
            ..FaultyLedger::default()
        });
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            Scripted::Fail,
        ));
        let c = coordinator(ledger, Arc::clone(&capacity));

        let result = c.create(&user(2, "bob"), request(1)).await;
        assert!(matches!(result, Err(PlatformError::Inconsistent(_))));
        assert_eq!(capacity.release_calls(), 1);
    }

    #[tokio::test]
    async fn release_failure_keeps_registration() {
        let ledger = Arc::new(InMemoryLedger::new());
        let Ok(original) = ledger.insert(bob_on_event_one()).await else {
            panic!("insert failed");
        };
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            Scripted::Reply(ReleaseReply {
                status: ReleaseStatus::InternalError,
            }),
        ));
        let c = coordinator(Arc::clone(&ledger) as Arc<dyn RegistrationLedger>, capacity);

        let result = c.delete(&user(2, "bob"), EventId::new(1)).await;
        assert!(matches!(result, Err(PlatformError::Internal(_))));
        let Ok(Some(kept)) = ledger.find_one(EventId::new(1), UserId::new(2)).await else {
            panic!("registration was not restored");
        };
        assert_eq!(kept, original);
    }

    #[tokio::test]
    async fn release_of_vanished_event_reports_not_found() {
        let ledger = Arc::new(InMemoryLedger::new());
        let _ = ledger.insert(bob_on_event_one()).await;
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            Scripted::Reply(ReleaseReply {
                status: ReleaseStatus::EventNotFound,
            }),
        ));
        let c = coordinator(Arc::clone(&ledger) as Arc<dyn RegistrationLedger>, capacity);

        let result = c.delete(&user(2, "bob"), EventId::new(1)).await;
        assert!(matches!(result, Err(PlatformError::EventNotFound(_))));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn no_op_release_still_removes_record() {
        let ledger = Arc::new(InMemoryLedger::new());
        let _ = ledger.insert(bob_on_event_one()).await;
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            Scripted::Reply(ReleaseReply {
                status: ReleaseStatus::NoOp,
            }),
        ));
        let c = coordinator(Arc::clone(&ledger) as Arc<dyn RegistrationLedger>, capacity);

        assert!(c.delete(&user(2, "bob"), EventId::new(1)).await.is_ok());
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn failed_ledger_delete_leaves_slot_held() {
        let ledger = Arc::new(FaultyLedger {
            fail_delete: true,
            ..FaultyLedger::default()
        });
        let _ = ledger.inner.insert(bob_on_event_one()).await;
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            ok_release(),
        ));
        let c = coordinator(
            Arc::clone(&ledger) as Arc<dyn RegistrationLedger>,
            Arc::clone(&capacity),
        );

        let result = c.delete(&user(2, "bob"), EventId::new(1)).await;
        assert!(matches!(result, Err(PlatformError::PersistenceError(_))));
        assert_eq!(capacity.release_calls(), 0);
        assert_eq!(ledger.inner.len().await, 1);
    }

    #[tokio::test]
    async fn failed_restore_after_release_failure_is_inconsistent() {
        let ledger = Arc::new(FaultyLedger {
            fail_restore: true,
            ..FaultyLedger::default()
        });
        let _ = ledger.inner.insert(bob_on_event_one()).await;
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::success(2)),
            Scripted::Fail,
        ));
        let c = coordinator(
            Arc::clone(&ledger) as Arc<dyn RegistrationLedger>,
            Arc::clone(&capacity),
        );

        let result = c.delete(&user(2, "bob"), EventId::new(1)).await;
        assert!(matches!(result, Err(PlatformError::Inconsistent(_))));
        assert_eq!(capacity.release_calls(), 1);
        assert!(ledger.inner.is_empty().await);
    }

    /// Ledger that misses the caller's record on the first lookup only, as
    /// if a concurrent create landed right after it.
    #[derive(Debug, Default)]
    struct LateLedger {
        inner: InMemoryLedger,
        looked_up: AtomicBool,
    }

    #[async_trait]
    impl RegistrationLedger for LateLedger {
        async fn find_one(
            &self,
            event_id: EventId,
            user_id: UserId,
        ) -> Result<Option<Registration>, PlatformError> {
            if !self.looked_up.swap(true, AtomicOrdering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_one(event_id, user_id).await
        }

        async fn insert(&self, r: NewRegistration) -> Result<Registration, PlatformError> {
            self.inner.insert(r).await
        }

        async fn delete(&self, id: RegistrationId) -> Result<bool, PlatformError> {
            self.inner.delete(id).await
        }

        async fn restore(&self, r: &Registration) -> Result<(), PlatformError> {
            self.inner.restore(r).await
        }

        async fn find_by_user(
            &self,
            user_id: UserId,
            page: Page,
        ) -> Result<(Vec<Registration>, u64), PlatformError> {
            self.inner.find_by_user(user_id, page).await
        }
    }

    #[tokio::test]
    async fn full_event_after_concurrent_own_create_is_duplicate() {
        let ledger = Arc::new(LateLedger::default());
        let _ = ledger.inner.insert(bob_on_event_one()).await;
        let capacity = Arc::new(ScriptedCapacity::new(
            Scripted::Reply(ReserveReply::failed(ReserveStatus::EventFull)),
            ok_release(),
        ));
        let c = coordinator(ledger, Arc::clone(&capacity));

        let result = c.create(&user(2, "bob"), request(1)).await;
        assert!(matches!(
            result,
            Err(PlatformError::DuplicateRegistration { .. })
        ));
        assert_eq!(capacity.release_calls(), 0);
    }

    #[tokio::test]
    async fn full_event_for_unregistered_user_stays_full() {
        let s = stack(2).await;
        assert!(s.coordinator.create(&user(2, "bob"), s.request()).await.is_ok());
        let result = s.coordinator.create(&user(3, "carol"), s.request()).await;
        assert!(matches!(result, Err(PlatformError::EventFull(_))));
    }

    #[tokio::test]
    async fn concurrent_same_user_on_last_slot_sees_duplicate() {
        let s = Arc::new(slow_stack(2).await);

        let attempts = (0..6).map(|_| {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.coordinator.create(&user(2, "bob"), s.request()).await })
        });
        let results = join_all(attempts).await;

        let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(PlatformError::EventFull(_)))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(full, 0);
        assert_eq!(s.participants().await, 2);
    }
}
