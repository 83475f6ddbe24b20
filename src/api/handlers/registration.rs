//! Registration handlers: register, cancel, list own.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateRegistrationRequest, DeleteRegistrationRequest, DeleteRegistrationResponse,
    PaginationParams, RegistrationDto, RegistrationListResponse,
};
use crate::app_state::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, PlatformError};
use crate::service::RegistrationRequest;

/// `POST /registrations` — Register the caller for an event.
///
/// # Errors
///
/// Returns the coordinator's [`PlatformError`] (409 for duplicate, owner or
/// full; 404 for an unknown event; 500 when the capacity call failed).
#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    tag = "Registrations",
    summary = "Register for an event",
    description = "Reserves a slot on the event and records the registration. The user comes from the access token.",
    request_body = CreateRegistrationRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Registered", body = RegistrationDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Duplicate, owner, or event full", body = ErrorResponse),
        (status = 500, description = "Capacity service failure", body = ErrorResponse),
    )
)]
pub async fn create_registration(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(req): Json<CreateRegistrationRequest>,
) -> Result<impl IntoResponse, PlatformError> {
    let request = RegistrationRequest {
        event_id: req.event_id,
        comment: req.comment,
    };
    let registration = state.coordinator()?.create(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(RegistrationDto::from(registration))))
}

/// `DELETE /registrations` — Cancel the caller's registration.
///
/// # Errors
///
/// Returns [`PlatformError::NotRegistered`] if there is nothing to cancel,
/// or a 500 when the ledger could not be updated or the release failed
/// (the registration is then restored).
#[utoipa::path(
    delete,
    path = "/api/v1/registrations",
    tag = "Registrations",
    summary = "Cancel a registration",
    request_body = DeleteRegistrationRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Cancelled", body = DeleteRegistrationResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Not registered", body = ErrorResponse),
        (status = 500, description = "Capacity or ledger failure", body = ErrorResponse),
    )
)]
pub async fn delete_registration(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(req): Json<DeleteRegistrationRequest>,
) -> Result<Json<DeleteRegistrationResponse>, PlatformError> {
    state.coordinator()?.delete(&identity, req.event_id).await?;
    Ok(Json(DeleteRegistrationResponse {
        event_id: req.event_id,
        status: "cancelled".to_string(),
    }))
}

/// `GET /registrations/my` — List the caller's registrations.
///
/// # Errors
///
/// Returns [`PlatformError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/registrations/my",
    tag = "Registrations",
    summary = "List my registrations",
    params(PaginationParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated registrations", body = RegistrationListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn list_my_registrations(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<RegistrationListResponse>, PlatformError> {
    let params = params.clamped();
    let (registrations, total) = state
        .coordinator()?
        .list_mine(&identity, params.window())
        .await?;
    Ok(Json(RegistrationListResponse {
        data: registrations.into_iter().map(RegistrationDto::from).collect(),
        pagination: params.meta(total),
    }))
}

/// Registration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/registrations",
            post(create_registration).delete(delete_registration),
        )
        .route("/registrations/my", get(list_my_registrations))
}
