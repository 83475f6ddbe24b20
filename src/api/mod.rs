//! REST API layer: route handlers, DTOs, router composition and the
//! OpenAPI document.
//!
//! Public endpoints are mounted under `/api/v1`; the capacity RPC
//! endpoints live under `/rpc/v1` and are only served by processes that
//! own the capacity role.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::app_state::AppState;
use crate::config::ServiceRole;

/// Builds the router for a deployment role.
///
/// `/health` is present on every role.
pub fn build_router(role: ServiceRole) -> Router<AppState> {
    let api = match role {
        ServiceRole::Event => handlers::event::routes(),
        ServiceRole::Registration => handlers::registration::routes(),
        ServiceRole::Standalone => {
            handlers::event::routes().merge(handlers::registration::routes())
        }
    };

    let router = Router::new()
        .nest("/api/v1", api)
        .merge(handlers::system::routes());

    match role {
        ServiceRole::Registration => router,
        ServiceRole::Event | ServiceRole::Standalone => {
            router.merge(handlers::capacity::routes())
        }
    }
}

/// OpenAPI document for every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "event-registration",
        description = "Capacity-bounded event registration: events, slot reservation and registrations."
    ),
    paths(
        handlers::event::create_event,
        handlers::event::update_event,
        handlers::event::cancel_event,
        handlers::event::list_events,
        handlers::event::get_event,
        handlers::registration::create_registration,
        handlers::registration::delete_registration,
        handlers::registration::list_my_registrations,
        handlers::capacity::reserve_slot,
        handlers::capacity::release_slot,
        handlers::system::health_handler,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorBody)),
    modifiers(&BearerAuth),
    tags(
        (name = "Events", description = "Event catalogue"),
        (name = "Registrations", description = "Registering for and cancelling events"),
        (name = "Capacity", description = "Internal slot reservation RPC"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
