//! Sync service: extract, merge, persist locally, push to the backend.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::dom::Page;
use crate::error::{SyncError, SyncResult};
use crate::pipeline::extract::extract_conversation;
use crate::pipeline::normalize::normalize_conversation;
use crate::providers::registry::ProviderRegistry;
use crate::stores::list_histories;
use crate::traits::backend::HistoryBackend;
use crate::traits::store::KeyValueStore;
use crate::types::config::SyncConfig;
use crate::types::conversation::Conversation;
use crate::types::history::{build_history_key, build_quarantine_key, ChatPayload, HistoryRecord};

/// Result of saving one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Merged record written to the local store
    pub saved: bool,

    /// Record accepted by the backend
    pub synced: bool,

    /// Messages in the merged record
    pub message_count: usize,
}

/// Result of pushing every stored history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncAllReport {
    /// Records accepted by the backend
    pub pushed: usize,

    /// Keys (or conversation ids) that failed to push or decode
    pub failed: Vec<String>,
}

impl SyncAllReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Flatten a history record into the body of `POST /chats`.
pub fn to_backend_payload(record: &HistoryRecord) -> ChatPayload {
    record.to_payload()
}

/// Orchestrates local persistence and backend sync.
pub struct SyncService<S, B> {
    store: S,
    backend: B,
    config: SyncConfig,
}

impl<S: KeyValueStore, B: HistoryBackend> SyncService<S, B> {
    pub fn new(store: S, backend: B, config: SyncConfig) -> Self {
        Self { store, backend, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the stored record for `(provider, conversation_id)`.
    ///
    /// A stored value that no longer decodes is treated as absent.
    pub async fn load(&self, provider: &str, conversation_id: &str) -> SyncResult<Option<HistoryRecord>> {
        let key = build_history_key(provider, conversation_id);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring undecodable history record");
                Ok(None)
            }
        }
    }

    /// Merge `conversation` into its stored record and persist it.
    ///
    /// An undecodable stored record is copied to a quarantine key first so
    /// the overwrite never loses it.
    pub async fn save(&self, conversation: &Conversation) -> SyncResult<HistoryRecord> {
        let existing = self.load_for_merge(&conversation.provider, &conversation.conversation_id).await?;
        let record = normalize_conversation(conversation, existing.as_ref());
        let value = serde_json::to_value(&record).map_err(crate::error::StoreError::from)?;
        self.store.set(&record.key(), value).await?;
        debug!(key = %record.key(), messages = record.message_count(), "Saved history record");
        Ok(record)
    }

    async fn load_for_merge(&self, provider: &str, conversation_id: &str) -> SyncResult<Option<HistoryRecord>> {
        let key = build_history_key(provider, conversation_id);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<HistoryRecord>(value.clone()) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                let quarantine = build_quarantine_key(&key, Utc::now().timestamp_millis());
                self.store.set(&quarantine, value).await?;
                warn!(key = %key, quarantine = %quarantine, error = %e, "Moved undecodable history record aside");
                Ok(None)
            }
        }
    }

    /// Save, then push the merged record.
    ///
    /// A failed push after a successful save is reported as
    /// `synced: false` and logged.
    pub async fn save_and_sync(&self, conversation: &Conversation) -> SyncResult<SyncOutcome> {
        let record = self.save(conversation).await?;
        let synced = self.push(&record).await;
        Ok(SyncOutcome {
            saved: true,
            synced,
            message_count: record.message_count(),
        })
    }

    /// Save, pushing only when auto sync is enabled.
    pub async fn capture(&self, conversation: &Conversation) -> SyncResult<SyncOutcome> {
        if self.config.auto_sync {
            return self.save_and_sync(conversation).await;
        }
        let record = self.save(conversation).await?;
        Ok(SyncOutcome {
            saved: true,
            synced: false,
            message_count: record.message_count(),
        })
    }

    /// Resolve the descriptor for `page`, extract, then [`capture`](Self::capture).
    pub async fn extract_and_capture(&self, registry: &ProviderRegistry, page: &Page) -> SyncResult<SyncOutcome> {
        let conversation = extract_page(registry, page)?;
        self.capture(&conversation).await
    }

    /// Push every stored history record.
    pub async fn sync_all(&self) -> SyncResult<SyncAllReport> {
        let histories = list_histories(&self.store).await?;
        let mut report = SyncAllReport::default();

        for value in histories {
            let record: HistoryRecord = match serde_json::from_value::<HistoryRecord>(value.clone()) {
                Ok(record) => record,
                Err(e) => {
                    let label = describe(&value);
                    warn!(record = %label, error = %e, "Skipping undecodable history record");
                    report.failed.push(label);
                    continue;
                }
            };

            if self.push(&record).await {
                report.pushed += 1;
            } else {
                report.failed.push(record.conversation_id.clone());
            }
        }

        info!(pushed = report.pushed, failed = report.failed.len(), "Synced all histories");
        Ok(report)
    }

    async fn push(&self, record: &HistoryRecord) -> bool {
        match self.backend.push_chat(&to_backend_payload(record)).await {
            Ok(()) => {
                info!(
                    backend = self.backend.name(),
                    provider = %record.provider,
                    conversation_id = %record.conversation_id,
                    messages = record.message_count(),
                    "Synced conversation"
                );
                true
            }
            Err(e) => {
                error!(
                    backend = self.backend.name(),
                    conversation_id = %record.conversation_id,
                    error = %e,
                    "Failed to sync conversation"
                );
                false
            }
        }
    }
}

/// Resolve the active descriptor for `page` and extract its conversation.
pub fn extract_page(registry: &ProviderRegistry, page: &Page) -> SyncResult<Conversation> {
    let descriptor = registry.resolve(page.url()).ok_or_else(|| SyncError::NoProvider {
        url: page.url().to_string(),
    })?;
    Ok(extract_conversation(&descriptor, page)?)
}

fn describe(value: &Value) -> String {
    value
        .get("conversationId")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string()
}
