//! Capacity remote operations: wire contract and client implementations.
//!
//! The registration side reaches the capacity side only through
//! [`CapacityClient`]. [`HttpCapacityClient`] speaks the HTTP+JSON binding
//! served by [`crate::api::handlers::capacity`]; [`LocalCapacityClient`]
//! calls the service in-process when both roles share a binary.
//!
//! Outcomes travel in the reply's `status` field. Anything that prevents a
//! reply from arriving (connect failure, timeout, non-2xx, undecodable
//! body) is an [`RpcError`], and the caller must treat the outcome as
//! unknown.

pub mod http;
pub mod local;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EventId;

pub use http::HttpCapacityClient;
pub use local::LocalCapacityClient;

/// Path of the reserve operation on the capacity service.
pub const RESERVE_PATH: &str = "/rpc/v1/capacity/reserve";
/// Path of the release operation on the capacity service.
pub const RELEASE_PATH: &str = "/rpc/v1/capacity/release";

/// Request body shared by both capacity operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    /// Target event.
    pub event_id: EventId,
    /// Caller username, compared against the event owner.
    pub caller_identity: String,
}

/// Outcome of `ReserveSlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReserveStatus {
    /// A slot was claimed.
    Success,
    /// No such event.
    EventNotFound,
    /// The event is at capacity.
    EventFull,
    /// The caller owns the event and already occupies a slot.
    CallerIsOwner,
    /// Storage failure on the capacity side; nothing was claimed.
    InternalError,
}

/// Reply of `ReserveSlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReserveReply {
    /// Outcome.
    pub status: ReserveStatus,
    /// Participant count after the claim; meaningful only on success.
    #[serde(default)]
    pub current_participants: i32,
}

impl ReserveReply {
    /// Builds a successful reply.
    #[must_use]
    pub const fn success(current_participants: i32) -> Self {
        Self {
            status: ReserveStatus::Success,
            current_participants,
        }
    }

    /// Builds a non-success reply.
    #[must_use]
    pub const fn failed(status: ReserveStatus) -> Self {
        Self {
            status,
            current_participants: 0,
        }
    }
}

/// Outcome of `ReleaseSlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    /// A slot was freed.
    Success,
    /// No such event.
    EventNotFound,
    /// Nothing to free (caller is the owner, or only the owner remains).
    NoOp,
    /// Storage failure on the capacity side; nothing was freed.
    InternalError,
}

/// Reply of `ReleaseSlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseReply {
    /// Outcome.
    pub status: ReleaseStatus,
}

/// Failure to obtain a reply from the capacity service.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request could not be sent or the connection broke.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No reply within the configured bound.
    #[error("capacity call timed out after {0} ms")]
    Timeout(u64),

    /// The service answered with a non-success HTTP status.
    #[error("capacity service answered HTTP {0}")]
    UnexpectedStatus(u16),

    /// The reply body did not match the contract.
    #[error("undecodable reply: {0}")]
    Decode(String),
}

/// Client side of the two capacity operations.
#[async_trait]
pub trait CapacityClient: Send + Sync + fmt::Debug {
    /// Claims one slot on `event_id` for `caller_identity`.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] when no reply was obtained.
    async fn reserve_slot(
        &self,
        event_id: EventId,
        caller_identity: &str,
    ) -> Result<ReserveReply, RpcError>;

    /// Frees one slot on `event_id` for `caller_identity`.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] when no reply was obtained.
    async fn release_slot(
        &self,
        event_id: EventId,
        caller_identity: &str,
    ) -> Result<ReleaseReply, RpcError>;
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn reserve_reply_uses_wire_names() {
        let Ok(json) = serde_json::to_value(ReserveReply::success(3)) else {
            panic!("serialization failed");
        };
        assert_eq!(
            json,
            serde_json::json!({"status": "SUCCESS", "currentParticipants": 3})
        );
    }

    #[test]
    fn release_reply_decodes_no_op() {
        let Ok(reply) = serde_json::from_str::<ReleaseReply>(r#"{"status":"NO_OP"}"#) else {
            panic!("deserialization failed");
        };
        assert_eq!(reply.status, ReleaseStatus::NoOp);
    }

    #[test]
    fn reserve_reply_without_count_defaults_to_zero() {
        let Ok(reply) = serde_json::from_str::<ReserveReply>(r#"{"status":"EVENT_FULL"}"#) else {
            panic!("deserialization failed");
        };
        assert_eq!(reply, ReserveReply::failed(ReserveStatus::EventFull));
    }

    #[test]
    fn slot_request_is_camel_case() {
        let Ok(req) = serde_json::from_str::<SlotRequest>(
            r#"{"eventId": 4, "callerIdentity": "bob"}"#,
        ) else {
            panic!("deserialization failed");
        };
        assert_eq!(req.event_id, EventId::new(4));
        assert_eq!(req.caller_identity, "bob");
    }
}
