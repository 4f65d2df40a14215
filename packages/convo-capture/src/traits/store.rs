//! Key/value persistence used for descriptor caching and history records.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StoreResult;

/// A flat JSON key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Snapshot of every entry.
    async fn get_all(&self) -> StoreResult<HashMap<String, Value>>;

    /// Entries whose key starts with `prefix`, sorted by key.
    async fn get_with_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        let mut entries: Vec<_> = self
            .get_all()
            .await?
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

// Lets one store back both the descriptor cache and the sync service.
#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key).await
    }

    async fn get_all(&self) -> StoreResult<HashMap<String, Value>> {
        (**self).get_all().await
    }
}
