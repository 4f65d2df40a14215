//! Merge a fresh extraction into the persisted history record.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::pipeline::dedupe::deduplicate_messages;
use crate::types::conversation::{Conversation, Message};
use crate::types::history::{HistoryRecord, UNTITLED_CONVERSATION};

/// Merge `extracted` with the previously stored record for the same key.
pub fn normalize_conversation(extracted: &Conversation, existing: Option<&HistoryRecord>) -> HistoryRecord {
    normalize_conversation_at(extracted, existing, Utc::now())
}

/// [`normalize_conversation`] with an explicit clock.
///
/// `updated_at` never moves backwards relative to the existing record.
pub fn normalize_conversation_at(
    extracted: &Conversation,
    existing: Option<&HistoryRecord>,
    now: DateTime<Utc>,
) -> HistoryRecord {
    let previous: &[Message] = existing.map(|r| r.messages.as_slice()).unwrap_or_default();
    let messages = merge_messages(previous, &extracted.messages);

    debug!(
        provider = %extracted.provider,
        conversation_id = %extracted.conversation_id,
        existing = previous.len(),
        fresh = extracted.messages.len(),
        merged = messages.len(),
        "Merged conversation"
    );

    let title = extracted.title.trim();
    let updated_at = existing.map_or(now, |r| now.max(r.updated_at));

    HistoryRecord {
        id: existing.map_or_else(|| extracted.id.clone(), |r| r.id.clone()),
        provider: extracted.provider.clone(),
        conversation_id: extracted.conversation_id.clone(),
        title: if title.is_empty() {
            UNTITLED_CONVERSATION.to_string()
        } else {
            title.to_string()
        },
        description: extracted.description.clone().unwrap_or_default(),
        model: extracted
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| extracted.provider.clone()),
        messages,
        labels: extracted.labels.clone(),
        created_at: existing.map_or(now, |r| r.created_at),
        updated_at,
        metadata: extracted.metadata.clone(),
        url: extracted.url.clone(),
        extracted_at: extracted.extracted_at,
    }
}

/// Existing messages followed by fresh ones, deduplicated.
pub fn merge_messages(existing: &[Message], fresh: &[Message]) -> Vec<Message> {
    deduplicate_messages(existing.iter().chain(fresh).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::conversation::Role;
    use chrono::{Duration, TimeZone};

    fn extraction(messages: Vec<Message>) -> Conversation {
        Conversation {
            id: "conv_abc_1".into(),
            provider: "ChatGPT".into(),
            conversation_id: "abc".into(),
            title: "Lifetimes".into(),
            messages,
            url: "https://chatgpt.com/c/abc".into(),
            extracted_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            description: None,
            model: None,
            labels: vec![],
            metadata: Default::default(),
        }
    }

    fn turn(index: usize) -> Message {
        let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
        Message::new(format!("msg_{}", index), role, format!("turn {}", index), index)
    }

    #[test]
    fn test_first_merge_sets_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = normalize_conversation_at(&extraction(vec![turn(0), turn(1)]), None, now);

        assert_eq!(record.id, "conv_abc_1");
        assert_eq!(record.model, "ChatGPT");
        assert_eq!(record.description, "");
        assert!(record.labels.is_empty());
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.message_count(), 2);
        assert_eq!(record.key(), "history_ChatGPT_abc");
    }

    #[test]
    fn test_remerge_preserves_created_at_and_adds_only_new_messages() {
        let first_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let first = normalize_conversation_at(&extraction(vec![turn(0), turn(1)]), None, first_at);

        let mut fresh = extraction(vec![turn(0), turn(1), turn(2), turn(3)]);
        fresh.id = "conv_abc_2".into();
        fresh.model = Some("gpt-4o".into());
        let later = first_at + Duration::minutes(5);
        let second = normalize_conversation_at(&fresh, Some(&first), later);

        assert_eq!(second.id, "conv_abc_1");
        assert_eq!(second.created_at, first_at);
        assert_eq!(second.updated_at, later);
        assert_eq!(second.model, "gpt-4o");
        let ids: Vec<_> = second.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["msg_0", "msg_1", "msg_2", "msg_3"]);
    }

    #[test]
    fn test_updated_at_never_moves_backwards() {
        let first_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let first = normalize_conversation_at(&extraction(vec![turn(0)]), None, first_at);
        let skewed = normalize_conversation_at(&extraction(vec![turn(0)]), Some(&first), first_at - Duration::hours(1));
        assert_eq!(skewed.updated_at, first_at);
    }

    #[test]
    fn test_blank_title_becomes_untitled() {
        let mut fresh = extraction(vec![turn(0)]);
        fresh.title = "   ".into();
        assert_eq!(normalize_conversation(&fresh, None).title, UNTITLED_CONVERSATION);
    }
}
