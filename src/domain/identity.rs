//! Verified caller identity.

use serde::Serialize;

use super::UserId;

/// Caller identity produced once by access-token verification.
///
/// Passed explicitly into the coordinator and services instead of a
/// loosely-typed claim map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Numeric user id (`userID` claim).
    pub user_id: UserId,
    /// Login name (`username` claim); the canonical owner identity.
    pub username: String,
}

impl Identity {
    /// Creates an identity from its parts.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }

    /// Returns `true` when both fields are usable: a positive user id and
    /// a non-blank username.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.user_id.is_valid() && !self.username.trim().is_empty()
    }
}
