//! Persisted history records and the flattened backend payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::conversation::Message;

/// Prefix shared by every history record key in the key/value store.
pub const HISTORY_KEY_PREFIX: &str = "history_";

/// Prefix for undecodable history records moved aside before an overwrite.
pub const QUARANTINE_KEY_PREFIX: &str = "corrupt_";

/// Title used whenever nothing better can be resolved.
pub const UNTITLED_CONVERSATION: &str = "Untitled Conversation";

/// Build the storage key of the record for `(provider, conversation_id)`.
pub fn build_history_key(provider: &str, conversation_id: &str) -> String {
    format!("{}{}_{}", HISTORY_KEY_PREFIX, provider, conversation_id)
}

/// Side key holding an undecodable record found under `key`.
pub fn build_quarantine_key(key: &str, at_millis: i64) -> String {
    format!("{}{}_{}", QUARANTINE_KEY_PREFIX, key, at_millis)
}

/// A conversation as stored locally, merged across extraction passes.
///
/// One record per `(provider, conversation_id)`. `created_at` is set once;
/// `updated_at` is refreshed on every merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,

    pub provider: String,

    #[serde(rename = "conversationId")]
    pub conversation_id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default)]
    pub labels: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub url: String,

    #[serde(rename = "extractedAt")]
    pub extracted_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Storage key of this record.
    pub fn key(&self) -> String {
        build_history_key(&self.provider, &self.conversation_id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Flatten into the body of `POST /chats`.
    pub fn to_payload(&self) -> ChatPayload {
        ChatPayload {
            provider: self.provider.clone(),
            conversation_id: self.conversation_id.clone(),
            title: if self.title.trim().is_empty() {
                UNTITLED_CONVERSATION.to_string()
            } else {
                self.title.clone()
            },
            description: self.description.clone(),
            model: if self.model.is_empty() {
                self.provider.clone()
            } else {
                self.model.clone()
            },
            messages: self.messages.clone(),
            labels: self.labels.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Body of `POST /chats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub provider: String,
    pub conversation_id: String,
    pub title: String,
    pub description: String,
    pub model: String,
    pub messages: Vec<Message>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
