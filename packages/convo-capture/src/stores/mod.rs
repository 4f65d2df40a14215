//! Key/value store implementations.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage for tests and one-shot runs
//! - `FileStore` - A single JSON object file on disk

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde_json::Value;

use crate::error::StoreResult;
use crate::traits::store::KeyValueStore;
use crate::types::history::HISTORY_KEY_PREFIX;

/// Every stored history record value, sorted by key.
pub async fn list_histories<S: KeyValueStore + ?Sized>(store: &S) -> StoreResult<Vec<Value>> {
    Ok(store
        .get_with_prefix(HISTORY_KEY_PREFIX)
        .await?
        .into_iter()
        .map(|(_, value)| value)
        .collect())
}
