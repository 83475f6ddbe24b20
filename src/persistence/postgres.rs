//! PostgreSQL implementation of the persistence layer.
//!
//! The participant counter is only ever changed by a single conditional
//! `UPDATE ... WHERE <guard> RETURNING participants`, so the guard and the
//! write are evaluated under the same row lock. Owner edits use the same
//! pattern with `participants <= max_participants` as the guard.

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{EVENT_COLUMNS, EventRow, REGISTRATION_COLUMNS, RegistrationRow};
use super::{
    ConditionalUpdate, EventStore, EventUpdate, Page, RegistrationLedger, SlotAdjustment,
};
use crate::domain::{
    Event, EventChanges, EventId, EventStatus, NewEvent, NewRegistration, Registration,
    RegistrationId, RegistrationStatus, UserId,
};
use crate::error::PlatformError;

fn persistence(e: sqlx::Error) -> PlatformError {
    PlatformError::PersistenceError(e.to_string())
}

/// Runs the embedded schema migrations.
///
/// # Errors
///
/// Returns a [`PlatformError::PersistenceError`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), PlatformError> {
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| PlatformError::PersistenceError(e.to_string()))
}

/// PostgreSQL-backed event store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, PlatformError> {
        let sql = format!(
            "INSERT INTO events (name, description, category, location, latitude, longitude, \
             image_path, created_by, max_participants, participants, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1, $10, $11) RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.name)
            .bind(event.description)
            .bind(event.category)
            .bind(event.location)
            .bind(event.latitude)
            .bind(event.longitude)
            .bind(event.image_path)
            .bind(event.created_by)
            .bind(event.max_participants)
            .bind(event.start_time)
            .bind(event.end_time)
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(row.into())
    }

    async fn load_by_id(&self, id: EventId) -> Result<Option<Event>, PlatformError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(row.map(Event::from))
    }

    async fn list(&self, page: Page) -> Result<(Vec<Event>, u64), PlatformError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;

        Ok((
            rows.into_iter().map(Event::from).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }

    async fn conditional_update_participants(
        &self,
        id: EventId,
        adjustment: SlotAdjustment,
    ) -> Result<ConditionalUpdate, PlatformError> {
        let sql = match adjustment {
            SlotAdjustment::Claim => {
                "UPDATE events SET participants = participants + 1, updated_at = now() \
                 WHERE id = $1 AND status = 'active' AND participants < max_participants \
                 RETURNING participants"
            }
            SlotAdjustment::Free => {
                "UPDATE events SET participants = participants - 1, updated_at = now() \
                 WHERE id = $1 AND participants > 1 RETURNING participants"
            }
        };

        let updated = sqlx::query_scalar::<_, i32>(sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        if let Some(participants) = updated {
            return Ok(ConditionalUpdate::Applied { participants });
        }

        // Zero rows: the guard failed, the event is closed, or the row is gone.
        let current = sqlx::query_as::<_, (i32, String)>(
            "SELECT participants, status FROM events WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(match current {
            Some((_, status))
                if adjustment == SlotAdjustment::Claim
                    && EventStatus::parse(&status) != EventStatus::Active =>
            {
                ConditionalUpdate::Closed
            }
            Some((participants, _)) => ConditionalUpdate::Rejected { participants },
            None => ConditionalUpdate::NotFound,
        })
    }

    async fn update_details(
        &self,
        id: EventId,
        changes: EventChanges,
    ) -> Result<EventUpdate, PlatformError> {
        let sql = format!(
            "UPDATE events SET name = $2, description = $3, category = $4, location = $5, \
             latitude = $6, longitude = $7, image_path = $8, max_participants = $9, \
             start_time = $10, end_time = $11, updated_at = now() \
             WHERE id = $1 AND participants <= $9 RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.get())
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.category)
            .bind(changes.location)
            .bind(changes.latitude)
            .bind(changes.longitude)
            .bind(changes.image_path)
            .bind(changes.max_participants)
            .bind(changes.start_time)
            .bind(changes.end_time)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        if let Some(row) = row {
            return Ok(EventUpdate::Applied(Box::new(row.into())));
        }

        let current =
            sqlx::query_scalar::<_, i32>("SELECT participants FROM events WHERE id = $1")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;

        Ok(match current {
            Some(participants) => EventUpdate::CapacityBelowParticipants { participants },
            None => EventUpdate::NotFound,
        })
    }

    async fn set_status(
        &self,
        id: EventId,
        status: EventStatus,
    ) -> Result<Option<Event>, PlatformError> {
        let sql = format!(
            "UPDATE events SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.get())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(row.map(Event::from))
    }
}

/// PostgreSQL-backed registration ledger.
///
/// Relies on the `registrations_event_user_unique` constraint for the
/// one-record-per-pair rule.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new ledger with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationLedger for PostgresLedger {
    async fn find_one(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Registration>, PlatformError> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(event_id.get())
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(row.map(Registration::from))
    }

    async fn insert(&self, registration: NewRegistration) -> Result<Registration, PlatformError> {
        let sql = format!(
            "INSERT INTO registrations (event_id, user_id, status, comment) \
             VALUES ($1, $2, $3, $4) RETURNING {REGISTRATION_COLUMNS}"
        );
        let result = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(registration.event_id.get())
            .bind(registration.user_id.get())
            .bind(RegistrationStatus::Registered.as_str())
            .bind(registration.comment)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(PlatformError::DuplicateRegistration {
                    event_id: registration.event_id,
                    user_id: registration.user_id,
                })
            }
            Err(e) => Err(persistence(e)),
        }
    }

    async fn delete(&self, id: RegistrationId) -> Result<bool, PlatformError> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(result.rows_affected() > 0)
    }

    async fn restore(&self, registration: &Registration) -> Result<(), PlatformError> {
        let result = sqlx::query(
            "INSERT INTO registrations \
             (id, event_id, user_id, status, comment, registration_time, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(registration.id.get())
        .bind(registration.event_id.get())
        .bind(registration.user_id.get())
        .bind(registration.status.as_str())
        .bind(registration.comment.as_deref())
        .bind(registration.registration_time)
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(PlatformError::DuplicateRegistration {
                    event_id: registration.event_id,
                    user_id: registration.user_id,
                })
            }
            Err(e) => Err(persistence(e)),
        }
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<(Vec<Registration>, u64), PlatformError> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 \
             ORDER BY registration_time DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(user_id.get())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM registrations WHERE user_id = $1")
                .bind(user_id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(persistence)?;

        Ok((
            rows.into_iter().map(Registration::from).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }
}
