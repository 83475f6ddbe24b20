//! REST endpoint handlers organized by resource.

pub mod capacity;
pub mod event;
pub mod registration;
pub mod system;
