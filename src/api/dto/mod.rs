//! Data Transfer Objects for REST request/response serialization.
//!
//! Timestamps are RFC 3339 strings; ids are plain JSON integers.

pub mod common_dto;
pub mod event_dto;
pub mod registration_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use registration_dto::*;
