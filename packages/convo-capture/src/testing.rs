//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the capture library
//! without a running history backend.

use async_trait::async_trait;
use chrono::Utc;
use history_api_client::ProvidersResponse;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::error::{BackendError, BackendResult};
use crate::traits::backend::HistoryBackend;
use crate::types::conversation::{Conversation, Message, Role};
use crate::types::history::ChatPayload;

/// A mock history backend.
///
/// Serves a configurable provider list and records every pushed payload.
#[derive(Default)]
pub struct MockBackend {
    /// Response for `GET /providers`
    providers: Arc<RwLock<ProvidersResponse>>,

    /// Fail every call
    failing: bool,

    /// Payloads accepted by `POST /chats`
    pushed: Arc<RwLock<Vec<ChatPayload>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockBackendCall>>>,
}

/// Record of a call made to the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBackendCall {
    FetchProviders,
    PushChat { conversation_id: String },
}

impl MockBackend {
    /// Create a mock with no providers that accepts every push.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `providers` under `version`.
    pub fn with_providers(self, version: Option<&str>, providers: Vec<Value>) -> Self {
        if let Ok(mut slot) = self.providers.write() {
            *slot = ProvidersResponse {
                version: version.map(str::to_string),
                providers,
            };
        }
        self
    }

    /// Fail every request.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Payloads pushed so far.
    pub fn pushed(&self) -> Vec<ChatPayload> {
        self.pushed.read().map(|p| p.clone()).unwrap_or_default()
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<MockBackendCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of `GET /providers` calls.
    pub fn provider_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockBackendCall::FetchProviders))
            .count()
    }

    fn record(&self, call: MockBackendCall) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(call);
        }
    }

    fn unavailable() -> BackendError {
        BackendError::Request("mock backend unavailable".into())
    }
}

#[async_trait]
impl HistoryBackend for MockBackend {
    async fn fetch_providers(&self) -> BackendResult<ProvidersResponse> {
        self.record(MockBackendCall::FetchProviders);
        if self.failing {
            return Err(Self::unavailable());
        }
        self.providers
            .read()
            .map(|p| p.clone())
            .map_err(|_| BackendError::InvalidResponse {
                reason: "mock state poisoned".into(),
            })
    }

    async fn push_chat(&self, payload: &ChatPayload) -> BackendResult<()> {
        self.record(MockBackendCall::PushChat {
            conversation_id: payload.conversation_id.clone(),
        });
        if self.failing {
            return Err(Self::unavailable());
        }
        if let Ok(mut pushed) = self.pushed.write() {
            pushed.push(payload.clone());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A ChatGPT conversation whose messages alternate user/assistant.
pub fn sample_conversation(conversation_id: &str, contents: &[&str]) -> Conversation {
    let messages = contents
        .iter()
        .enumerate()
        .map(|(index, content)| {
            let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
            Message::new(format!("msg_{}_{}", conversation_id, index), role, *content, index)
        })
        .collect();

    Conversation {
        id: format!("conv_{}_{}", conversation_id, uuid::Uuid::new_v4()),
        provider: "ChatGPT".to_string(),
        conversation_id: conversation_id.to_string(),
        title: format!("Conversation {}", conversation_id),
        messages,
        url: format!("https://chatgpt.com/c/{}", conversation_id),
        extracted_at: Utc::now(),
        description: None,
        model: None,
        labels: Vec::new(),
        metadata: serde_json::Map::new(),
    }
}

/// Markup of a chat page: one `data-message-author-role` element per
/// `(role, text)` turn.
pub fn chat_page_html(title: &str, turns: &[(&str, &str)]) -> String {
    let body: String = turns
        .iter()
        .map(|(role, text)| {
            format!(
                r#"<div data-message-author-role="{}"><div class="markdown">{}</div></div>"#,
                role, text
            )
        })
        .collect();
    format!("<html><head><title>{}</title></head><body><main>{}</main></body></html>", title, body)
}
