//! HTTP+JSON capacity client built on `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    CapacityClient, RELEASE_PATH, RESERVE_PATH, ReleaseReply, ReserveReply, RpcError, SlotRequest,
};
use crate::domain::EventId;

/// Calls a remote capacity service over HTTP.
///
/// Every request is bounded by the timeout given at construction.
#[derive(Debug, Clone)]
pub struct HttpCapacityClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCapacityClient {
    /// Creates a client for the service at `base_url` (e.g.
    /// `http://events:3001`).
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &SlotRequest,
    ) -> Result<T, RpcError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::UnexpectedStatus(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))
    }

    fn classify(&self, err: &reqwest::Error) -> RpcError {
        if err.is_timeout() {
            RpcError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl CapacityClient for HttpCapacityClient {
    async fn reserve_slot(
        &self,
        event_id: EventId,
        caller_identity: &str,
    ) -> Result<ReserveReply, RpcError> {
        let body = SlotRequest {
            event_id,
            caller_identity: caller_identity.to_string(),
        };
        self.call(RESERVE_PATH, &body).await
    }

    async fn release_slot(
        &self,
        event_id: EventId,
        caller_identity: &str,
    ) -> Result<ReleaseReply, RpcError> {
        let body = SlotRequest {
            event_id,
            caller_identity: caller_identity.to_string(),
        };
        self.call(RELEASE_PATH, &body).await
    }
}
