//! History backend: provider descriptor source and push target.

use async_trait::async_trait;
use history_api_client::{HistoryApiClient, ProvidersResponse};
use std::sync::Arc;

use crate::error::{BackendError, BackendResult};
use crate::types::history::ChatPayload;

/// Remote side of the sync flow.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// `GET /providers`
    async fn fetch_providers(&self) -> BackendResult<ProvidersResponse>;

    /// `POST /chats`
    async fn push_chat(&self, payload: &ChatPayload) -> BackendResult<()>;

    /// Get the backend name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl HistoryBackend for HistoryApiClient {
    async fn fetch_providers(&self) -> BackendResult<ProvidersResponse> {
        self.get_providers()
            .await
            .map_err(|e| BackendError::Request(Box::new(e)))
    }

    async fn push_chat(&self, payload: &ChatPayload) -> BackendResult<()> {
        self.post_chat(payload)
            .await
            .map(|_| ())
            .map_err(|e| BackendError::Request(Box::new(e)))
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[async_trait]
impl<T: HistoryBackend + ?Sized> HistoryBackend for Arc<T> {
    async fn fetch_providers(&self) -> BackendResult<ProvidersResponse> {
        (**self).fetch_providers().await
    }

    async fn push_chat(&self, payload: &ChatPayload) -> BackendResult<()> {
        (**self).push_chat(payload).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
