//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::error::PlatformError;
use crate::service::{CapacityService, RegistrationCoordinator};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Which services are present depends on the deployment role; a handler
/// asking for an absent service gets an internal error.
#[derive(Debug, Clone)]
pub struct AppState {
    capacity: Option<Arc<CapacityService>>,
    coordinator: Option<Arc<RegistrationCoordinator>>,
    /// Access-token verifier shared by all authenticated routes.
    pub identity: Arc<IdentityVerifier>,
}

impl AppState {
    /// State for the event/capacity role.
    #[must_use]
    pub fn for_capacity(capacity: Arc<CapacityService>, identity: Arc<IdentityVerifier>) -> Self {
        Self {
            capacity: Some(capacity),
            coordinator: None,
            identity,
        }
    }

    /// State for the registration role.
    #[must_use]
    pub fn for_registration(
        coordinator: Arc<RegistrationCoordinator>,
        identity: Arc<IdentityVerifier>,
    ) -> Self {
        Self {
            capacity: None,
            coordinator: Some(coordinator),
            identity,
        }
    }

    /// State for a single process serving both roles.
    #[must_use]
    pub fn standalone(
        capacity: Arc<CapacityService>,
        coordinator: Arc<RegistrationCoordinator>,
        identity: Arc<IdentityVerifier>,
    ) -> Self {
        Self {
            capacity: Some(capacity),
            coordinator: Some(coordinator),
            identity,
        }
    }

    /// Returns the capacity service.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Internal`] if this process does not run the
    /// capacity role.
    pub fn capacity(&self) -> Result<&Arc<CapacityService>, PlatformError> {
        self.capacity
            .as_ref()
            .ok_or_else(|| PlatformError::Internal("capacity role not enabled".to_string()))
    }

    /// Returns the registration coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Internal`] if this process does not run the
    /// registration role.
    pub fn coordinator(&self) -> Result<&Arc<RegistrationCoordinator>, PlatformError> {
        self.coordinator
            .as_ref()
            .ok_or_else(|| PlatformError::Internal("registration role not enabled".to_string()))
    }
}
