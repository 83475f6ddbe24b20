//! Service layer: business logic orchestration.
//!
//! [`CapacityService`] owns events and their occupancy counters.
//! [`RegistrationCoordinator`] owns the registration ledger and reaches the
//! capacity side only through a [`crate::rpc::CapacityClient`].

pub mod capacity_service;
pub mod registration_coordinator;

pub use capacity_service::{CapacityService, EventInput};
pub use registration_coordinator::{RegistrationCoordinator, RegistrationRequest};
