//! Message fingerprints and order-preserving deduplication.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::types::conversation::Message;

/// Stable fingerprint of a message.
///
/// Combines role, exact content and index, so the same text at a different
/// position is a different message. Message ids and timestamps are ignored.
pub fn generate_message_hash(message: &Message) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.role.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update((message.index as u64).to_le_bytes());
    hasher.update([0u8]);
    hasher.update(message.content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Keep the first occurrence of each fingerprint, preserving order.
pub fn deduplicate_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(messages.len());
    messages
        .into_iter()
        .filter(|message| seen.insert(generate_message_hash(message)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::conversation::Role;

    #[test]
    fn test_hash_ignores_id_but_not_index() {
        let a = Message::new("msg_1", Role::User, "Hi", 0);
        let b = Message::new("msg_2", Role::User, "Hi", 0);
        let c = Message::new("msg_3", Role::User, "Hi", 1);
        let d = Message::new("msg_4", Role::Assistant, "Hi", 0);

        assert_eq!(generate_message_hash(&a), generate_message_hash(&b));
        assert_ne!(generate_message_hash(&a), generate_message_hash(&c));
        assert_ne!(generate_message_hash(&a), generate_message_hash(&d));
        assert_eq!(generate_message_hash(&a).len(), 64);
    }

    #[test]
    fn test_content_is_exact() {
        let a = Message::new("1", Role::User, "Hi", 0);
        let b = Message::new("2", Role::User, "Hi ", 0);
        assert_ne!(generate_message_hash(&a), generate_message_hash(&b));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_in_order() {
        let messages = vec![
            Message::new("old_0", Role::User, "Q", 0),
            Message::new("old_1", Role::Assistant, "A", 1),
            Message::new("new_0", Role::User, "Q", 0),
            Message::new("new_1", Role::Assistant, "A", 1),
            Message::new("new_2", Role::User, "Q2", 2),
        ];
        let ids: Vec<_> = deduplicate_messages(messages).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["old_0", "old_1", "new_2"]);
    }
}
