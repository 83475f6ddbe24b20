//! In-process capacity client for the standalone role.

use std::sync::Arc;

use async_trait::async_trait;

use super::{CapacityClient, ReleaseReply, ReserveReply, RpcError};
use crate::domain::EventId;
use crate::service::CapacityService;

/// Forwards capacity calls directly to a [`CapacityService`] in the same
/// process. It never fails at the transport level.
#[derive(Debug, Clone)]
pub struct LocalCapacityClient {
    service: Arc<CapacityService>,
}

impl LocalCapacityClient {
    /// Wraps a capacity service.
    #[must_use]
    pub fn new(service: Arc<CapacityService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CapacityClient for LocalCapacityClient {
    async fn reserve_slot(
        &self,
        event_id: EventId,
        caller_identity: &str,
    ) -> Result<ReserveReply, RpcError> {
        Ok(self.service.reserve_slot(event_id, caller_identity).await)
    }

    async fn release_slot(
        &self,
        event_id: EventId,
        caller_identity: &str,
    ) -> Result<ReleaseReply, RpcError> {
        Ok(self.service.release_slot(event_id, caller_identity).await)
    }
}
