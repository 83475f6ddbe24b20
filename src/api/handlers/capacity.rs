//! Capacity RPC endpoints served by the event role.
//!
//! Every outcome is a `200` with the result in `status`; callers treat any
//! other HTTP status as a transport failure.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::{ErrorResponse, PlatformError};
use crate::rpc::{RELEASE_PATH, RESERVE_PATH, ReleaseReply, ReserveReply, SlotRequest};

/// `POST /rpc/v1/capacity/reserve` — Claim one slot.
///
/// # Errors
///
/// Returns [`PlatformError::Internal`] only if this process does not run
/// the capacity role.
#[utoipa::path(
    post,
    path = "/rpc/v1/capacity/reserve",
    tag = "Capacity",
    summary = "Reserve a slot",
    description = "Atomically claims one slot unless the caller owns the event or it is full.",
    request_body = SlotRequest,
    responses(
        (status = 200, description = "Outcome in `status`", body = ReserveReply),
        (status = 500, description = "Role not served here", body = ErrorResponse),
    )
)]
pub async fn reserve_slot(
    State(state): State<AppState>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<ReserveReply>, PlatformError> {
    let reply = state
        .capacity()?
        .reserve_slot(req.event_id, &req.caller_identity)
        .await;
    tracing::debug!(event_id = %req.event_id, status = ?reply.status, "reserve handled");
    Ok(Json(reply))
}

/// `POST /rpc/v1/capacity/release` — Free one slot.
///
/// # Errors
///
/// Returns [`PlatformError::Internal`] only if this process does not run
/// the capacity role.
#[utoipa::path(
    post,
    path = "/rpc/v1/capacity/release",
    tag = "Capacity",
    summary = "Release a slot",
    description = "Atomically frees one slot; never drops below the owner's own slot.",
    request_body = SlotRequest,
    responses(
        (status = 200, description = "Outcome in `status`", body = ReleaseReply),
        (status = 500, description = "Role not served here", body = ErrorResponse),
    )
)]
pub async fn release_slot(
    State(state): State<AppState>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<ReleaseReply>, PlatformError> {
    let reply = state
        .capacity()?
        .release_slot(req.event_id, &req.caller_identity)
        .await;
    tracing::debug!(event_id = %req.event_id, status = ?reply.status, "release handled");
    Ok(Json(reply))
}

/// Capacity RPC routes, mounted at the root.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(RESERVE_PATH, post(reserve_slot))
        .route(RELEASE_PATH, post(release_slot))
}
