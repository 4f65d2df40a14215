//! In-memory key/value store for testing and development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::KeyValueStore;

/// In-memory key/value store.
///
/// Not suitable for production as data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all stored data.
    pub fn clear(&self) -> StoreResult<()> {
        self.entries.write().map_err(|_| StoreError::Poisoned)?.clear();
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.read().map_err(|_| StoreError::Poisoned)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().map_err(|_| StoreError::Poisoned)?.remove(key);
        Ok(())
    }

    async fn get_all(&self) -> StoreResult<HashMap<String, Value>> {
        Ok(self.entries.read().map_err(|_| StoreError::Poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::list_histories;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_set_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", json!({"a": 1})).await.unwrap();
        store.set("k", json!({"a": 2})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 2})));
        assert_eq!(store.len(), 1);

        store.remove("k").await.unwrap();
        store.remove("missing").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_histories_filters_prefix() {
        let store = MemoryStore::new();
        store.set("history_Claude_b", json!("b")).await.unwrap();
        store.set("dom_provider_version", json!("v1")).await.unwrap();
        store.set("history_ChatGPT_a", json!("a")).await.unwrap();

        let histories = list_histories(&store).await.unwrap();
        assert_eq!(histories, vec![json!("a"), json!("b")]);
    }
}
