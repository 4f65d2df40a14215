//! The extraction engine: one descriptor, one page, one conversation.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dom::Page;
use crate::error::{ExtractionError, Result};
use crate::pipeline::identity::{resolve_conversation_id, resolve_title};
use crate::pipeline::messages::{collect_message_elements, extract_content, extract_timestamp};
use crate::pipeline::role::detect_role;
use crate::types::conversation::{Conversation, Message, Role};
use crate::types::descriptor::ProviderDescriptor;

/// Extract a conversation from `page` using `descriptor`.
///
/// Fails only when no conversation id resolves or no message survives.
/// Every other heuristic failure degrades inside the pass. The page is
/// read once and never mutated.
pub fn extract_conversation(descriptor: &ProviderDescriptor, page: &Page) -> Result<Conversation> {
    let conversation_id =
        resolve_conversation_id(&descriptor.conversation_id, page).ok_or(ExtractionError::NoConversationId)?;
    let title = resolve_title(&descriptor.title, page);

    let elements = collect_message_elements(&descriptor.messages, page);
    let mut messages: Vec<Message> = Vec::with_capacity(elements.len());
    let mut inferred = 0usize;
    let mut dropped = 0usize;

    for (index, element) in elements.iter().enumerate() {
        if let Some(filter) = &descriptor.message_filter {
            if !filter.keep(element) {
                continue;
            }
        }

        let role = match detect_role(element, &descriptor.role) {
            Some(role) => role,
            None => {
                inferred += 1;
                infer_role(&messages)
            }
        };

        let content = extract_content(element, &descriptor.content);
        if content.is_empty() {
            dropped += 1;
            continue;
        }

        let mut message = Message::new(random_id("msg", &conversation_id), role, content, index);
        if let Some(created_at) = descriptor
            .timestamp
            .as_ref()
            .and_then(|rule| extract_timestamp(element, rule))
        {
            message = message.with_created_at(created_at);
        }
        messages.push(message);
    }

    debug!(
        provider = %descriptor.id,
        discovered = elements.len(),
        inferred_roles = inferred,
        dropped_empty = dropped,
        "Built messages"
    );

    if messages.is_empty() {
        return Err(ExtractionError::NoMessages);
    }

    info!(
        provider = %descriptor.id,
        conversation_id = %conversation_id,
        messages = messages.len(),
        "Extracted conversation"
    );

    Ok(Conversation {
        id: random_id("conv", &conversation_id),
        provider: descriptor.id.clone(),
        conversation_id,
        title,
        messages,
        url: page.url().to_string(),
        extracted_at: Utc::now(),
        description: None,
        model: None,
        labels: Vec::new(),
        metadata: serde_json::Map::new(),
    })
}

/// Positional fallback: start with the user, then alternate from the last
/// message actually appended.
///
/// Best-effort only; a page whose roles cannot be detected may be labeled
/// out of phase.
pub fn infer_role(messages: &[Message]) -> Role {
    messages.last().map_or(Role::User, |last| last.role.next_turn())
}

fn random_id(kind: &str, conversation_id: &str) -> String {
    format!("{}_{}_{}", kind, conversation_id, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::strategy::{MessageFilter, Strategy};
    use crate::types::descriptor::{IdRule, IdStrategy, TimestampRule};
    use scraper::ElementRef;

    struct SkipHidden;

    impl Strategy for SkipHidden {}

    impl MessageFilter for SkipHidden {
        fn keep(&self, element: &ElementRef<'_>) -> bool {
            element.value().attr("hidden").is_none()
        }
    }

    fn descriptor() -> ProviderDescriptor {
        ProviderDescriptor::new("test")
            .with_conversation_id(IdStrategy::Rule(IdRule::from_url("/c/([a-zA-Z0-9-]+)")))
            .with_message_selectors(["[data-role]"])
    }

    #[test]
    fn test_end_to_end_two_messages() {
        let page = Page::parse(
            "https://x/c/42",
            r#"<div data-role="user">Hi</div><div data-role="assistant">Hello</div>"#,
        );
        let conversation = extract_conversation(&descriptor(), &page).unwrap();

        assert_eq!(conversation.conversation_id, "42");
        assert_eq!(conversation.provider, "test");
        assert_eq!(conversation.url, "https://x/c/42");
        assert!(conversation.id.starts_with("conv_42_"));

        let summary: Vec<_> = conversation
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str(), m.index))
            .collect();
        assert_eq!(summary, vec![(Role::User, "Hi", 0), (Role::Assistant, "Hello", 1)]);
        assert!(conversation.messages[0].id.starts_with("msg_42_"));
        assert_ne!(conversation.messages[0].id, conversation.messages[1].id);
    }

    #[test]
    fn test_no_messages() {
        let page = Page::parse("https://x/c/42", "<p>nothing here</p>");
        assert_eq!(
            extract_conversation(&descriptor(), &page).unwrap_err(),
            ExtractionError::NoMessages
        );
    }

    #[test]
    fn test_no_conversation_id() {
        let page = Page::parse("https://x/", r#"<div data-role="user">Hi</div>"#);
        assert_eq!(
            extract_conversation(&descriptor(), &page).unwrap_err(),
            ExtractionError::NoConversationId
        );
    }

    #[test]
    fn test_blank_message_dropped_and_index_gap_kept() {
        let page = Page::parse(
            "https://x/c/7",
            r#"<div data-role="user">Q</div><div data-role="assistant">   </div><div data-role="assistant">A</div>"#,
        );
        let conversation = extract_conversation(&descriptor(), &page).unwrap();
        let indexes: Vec<_> = conversation.messages.iter().map(|m| m.index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert_eq!(conversation.messages[1].content, "A");
    }

    // Positional inference is best-effort: it only alternates.
    #[test]
    fn test_positional_inference_alternates_from_last_appended() {
        let page = Page::parse(
            "https://x/c/9",
            r#"<div class="row" data-kind="x">one</div>
               <div class="row" data-kind="x"> </div>
               <div class="row" data-kind="x">two</div>
               <div class="row" data-kind="x">three</div>"#,
        );
        let descriptor = ProviderDescriptor::new("test")
            .with_conversation_id(IdStrategy::Rule(IdRule::from_url("/c/(\\d+)")))
            .with_message_selectors([".row"]);
        let conversation = extract_conversation(&descriptor, &page).unwrap();
        let roles: Vec<_> = conversation.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    }

    #[test]
    fn test_message_filter_and_timestamp() {
        let page = Page::parse(
            "https://x/c/5",
            r#"<div data-role="user" hidden>draft</div>
               <div data-role="user"><time datetime="2024-01-02T03:04:05Z"></time>Hi</div>"#,
        );
        let descriptor = descriptor()
            .with_message_filter(SkipHidden.into())
            .with_timestamp(TimestampRule::new().with_selector("time"));
        let conversation = extract_conversation(&descriptor, &page).unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].index, 1);
        assert!(conversation.messages[0].created_at.is_some());
    }
}
