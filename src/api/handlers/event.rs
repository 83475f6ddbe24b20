//! Event catalogue handlers: create, update, cancel, list, get.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, EventDto, EventListResponse, PaginationParams, UpdateEventRequest,
};
use crate::app_state::AppState;
use crate::auth::AuthenticatedUser;
use crate::domain::EventId;
use crate::error::{ErrorResponse, PlatformError};

/// `POST /events` — Create an event owned by the caller.
///
/// # Errors
///
/// Returns [`PlatformError::ValidationError`] when a field rule fails.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an event owned by the authenticated caller, who occupies the first slot.",
    request_body = CreateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, PlatformError> {
    let event = state
        .capacity()?
        .create_event(&identity, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(event))))
}

/// `PUT /events` — Edit an event owned by the caller.
///
/// # Errors
///
/// Returns [`PlatformError::Forbidden`] for a non-owner, or
/// [`PlatformError::ValidationError`] when a field rule fails.
#[utoipa::path(
    put,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Update an event",
    description = "Replaces the editable fields of an event. Only the owner may edit, \
                   the participant count is kept, and capacity cannot drop below it.",
    request_body = UpdateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event updated", body = EventDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<EventDto>, PlatformError> {
    let event = state
        .capacity()?
        .update_event(&identity, req.id, req.details.into())
        .await?;
    Ok(Json(event.into()))
}

/// `DELETE /events/{id}` — Cancel an event owned by the caller.
///
/// # Errors
///
/// Returns [`PlatformError::Forbidden`] for a non-owner, or
/// [`PlatformError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Cancel an event",
    description = "Marks the event cancelled. New registrations are refused; \
                   existing ones can still be withdrawn.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event cancelled", body = EventDto),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<EventDto>, PlatformError> {
    let event = state
        .capacity()?
        .cancel_event(&identity, EventId::new(id))
        .await?;
    Ok(Json(event.into()))
}

/// `GET /events` — List events with pagination.
///
/// # Errors
///
/// Returns [`PlatformError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<EventListResponse>, PlatformError> {
    let params = params.clamped();
    let (events, total) = state.capacity()?.list_events(params.window()).await?;
    Ok(Json(EventListResponse {
        data: events.into_iter().map(EventDto::from).collect(),
        pagination: params.meta(total),
    }))
}

/// `GET /events/{id}` — Get one event.
///
/// # Errors
///
/// Returns [`PlatformError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event details",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Event details", body = EventDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EventDto>, PlatformError> {
    let event = state.capacity()?.get_event(EventId::new(id)).await?;
    Ok(Json(event.into()))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events",
            post(create_event).get(list_events).put(update_event),
        )
        .route("/events/{id}", get(get_event).delete(cancel_event))
}
