//! Domain layer: identifiers, events, registrations and caller identity.
//!
//! Events and their capacity counters belong to the capacity side;
//! registrations belong to the ledger side. Neither side reaches into the
//! other's storage.

pub mod event;
pub mod identity;
pub mod ids;
pub mod registration;

pub use event::{Event, EventChanges, EventStatus, NewEvent};
pub use identity::Identity;
pub use ids::{EventId, RegistrationId, UserId};
pub use registration::{NewRegistration, Registration, RegistrationStatus};
