//! # event-registration
//!
//! Capacity-bounded event registration, split into two cooperating roles.
//!
//! The event role owns events and their occupancy counters and answers two
//! remote operations, reserve and release, each an atomic
//! check-and-update. The registration role owns the registration ledger
//! and coordinates every registration or cancellation with the event role,
//! compensating when its own write fails after a successful reservation.
//! Both roles can also run in a single process.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, bearer token)
//!     │
//!     ├── REST Handlers (api/)          AuthenticatedUser (auth)
//!     │
//!     ├── RegistrationCoordinator ──CapacityClient (rpc/)──┐
//!     │       │                                             │
//!     │   RegistrationLedger                        CapacityService
//!     │                                                     │
//!     │                                              EventStore
//!     │
//!     └── In-memory or PostgreSQL persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod rpc;
pub mod service;
