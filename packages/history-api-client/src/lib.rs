//! Pure REST client for the conversation history backend.
//!
//! Endpoints used:
//! - `GET {base}/providers` returns the current provider descriptors and a
//!   version tag.
//! - `POST {base}/chats` stores a flattened conversation history record.
//! - `GET {base}/prompts` and `GET {base}/templates` list the prompt library;
//!   `/{id}/versions/{version}` holds an item's content and variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use history_api_client::HistoryApiClient;
//!
//! let client = HistoryApiClient::new("http://localhost:8000/v1")?;
//! let providers = client.get_providers().await?;
//! println!("{} providers at version {:?}", providers.providers.len(), providers.version);
//! ```

pub mod error;
pub mod types;

pub use error::{ApiError, Result};
pub use types::{merge_library_items, ItemDetail, LibraryItem, LibraryItemKind, ProvidersResponse};

use types::{ItemsResponse, VersionDetail, VersionsResponse};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct HistoryApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl HistoryApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Self::with_client(client, base_url)
    }

    /// Use a preconfigured `reqwest::Client` (custom timeouts, proxies).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            client,
            base_url: trimmed,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch provider descriptors.
    pub async fn get_providers(&self) -> Result<ProvidersResponse> {
        self.get_json("providers").await
    }

    /// Push a flattened history record.
    pub async fn post_chat<T: Serialize + ?Sized>(&self, payload: &T) -> Result<serde_json::Value> {
        self.post_json("chats", payload).await
    }

    pub async fn list_prompts(&self, limit: usize) -> Result<Vec<LibraryItem>> {
        self.list_items(LibraryItemKind::Prompt, limit).await
    }

    pub async fn list_templates(&self, limit: usize) -> Result<Vec<LibraryItem>> {
        self.list_items(LibraryItemKind::Template, limit).await
    }

    /// Prompts and templates together, newest first.
    pub async fn list_library(&self, limit: usize) -> Result<Vec<LibraryItem>> {
        let prompts = self.list_prompts(limit).await?;
        let templates = self.list_templates(limit).await?;
        Ok(merge_library_items(prompts, templates))
    }

    /// Item metadata plus the content and variables of its latest version.
    ///
    /// When the version lookup fails the item is returned with empty content.
    pub async fn get_item_detail(&self, id: &str, kind: LibraryItemKind) -> Result<ItemDetail> {
        let mut item: LibraryItem = self.get_json(&format!("{}/{}", kind.endpoint(), id)).await?;
        item.kind = Some(kind);
        item.extra.remove("content");
        item.extra.remove("variables");

        let latest = match self.latest_version(id, kind).await {
            Ok(latest) => latest.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(id = %id, kind = kind.endpoint(), error = %e, "Failed to load latest version");
                VersionDetail::default()
            }
        };

        Ok(ItemDetail {
            item,
            content: latest.content.unwrap_or_default(),
            variables: latest.variables,
        })
    }

    async fn list_items(&self, kind: LibraryItemKind, limit: usize) -> Result<Vec<LibraryItem>> {
        let response: ItemsResponse = self.get_json(&format!("{}?limit={}", kind.endpoint(), limit)).await?;
        Ok(response.items)
    }

    async fn latest_version(&self, id: &str, kind: LibraryItemKind) -> Result<Option<VersionDetail>> {
        let base = format!("{}/{}/versions", kind.endpoint(), id);
        let versions: VersionsResponse = self.get_json(&base).await?;
        let Some(latest) = versions.versions.first() else {
            return Ok(None);
        };
        let detail = self.get_json(&format!("{}/{}", base, latest.id)).await?;
        Ok(Some(detail))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "GET");
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                method: "GET",
                url,
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "POST");
        let resp = self.client.post(&url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                method: "POST",
                url,
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
