//! Canonical conversation produced by one extraction pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parse a role name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }

    /// Role that follows this one when turns strictly alternate.
    pub fn next_turn(self) -> Role {
        match self {
            Role::User => Role::Assistant,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a conversation.
///
/// `index` is the position of the source element within its extraction
/// pass, so indices may have gaps where blank elements were dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub index: usize,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            created_at: None,
            index,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A conversation freshly extracted from a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Freshly generated for every pass
    pub id: String,

    /// Provider descriptor id (e.g. "ChatGPT")
    pub provider: String,

    /// Stable id of the source conversation
    pub conversation_id: String,

    pub title: String,

    pub messages: Vec<Message>,

    /// Page URL at extraction time
    pub url: String,

    pub extracted_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Conversation {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = labels.into_iter().map(|l| l.into()).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse(" Assistant "), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), Some(Role::System));
        assert_eq!(Role::parse("bot"), None);
    }

    #[test]
    fn test_next_turn_alternates() {
        assert_eq!(Role::User.next_turn(), Role::Assistant);
        assert_eq!(Role::Assistant.next_turn(), Role::User);
        assert_eq!(Role::System.next_turn(), Role::User);
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let message = Message::new("m1", Role::User, "Hi", 0);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["createdAt"], serde_json::Value::Null);
        assert_eq!(json["index"], 0);
    }
}
