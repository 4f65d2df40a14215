use proptest::prelude::*;

use convo_capture::{
    deduplicate_messages, generate_message_hash, normalize_conversation, Conversation, Message, Role,
};

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::System)]
}

// Small alphabets so duplicates actually occur.
fn arb_message() -> impl Strategy<Value = Message> {
    (arb_role(), "[ab ]{0,3}", 0usize..4, "[a-z]{4}")
        .prop_map(|(role, content, index, id)| Message::new(id, role, content, index))
}

fn arb_conversation() -> impl Strategy<Value = Conversation> {
    prop::collection::vec(arb_message(), 0..12).prop_map(|messages| Conversation {
        id: "conv_k_1".into(),
        provider: "Claude".into(),
        conversation_id: "k".into(),
        title: "t".into(),
        messages,
        url: "https://claude.ai/chat/k".into(),
        extracted_at: chrono::Utc::now(),
        description: None,
        model: None,
        labels: vec![],
        metadata: Default::default(),
    })
}

fn hashes(messages: &[Message]) -> Vec<String> {
    messages.iter().map(generate_message_hash).collect()
}

proptest! {
    #[test]
    fn dedup_is_idempotent(messages in prop::collection::vec(arb_message(), 0..20)) {
        let once = deduplicate_messages(messages);
        let twice = deduplicate_messages(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn dedup_preserves_relative_order(messages in prop::collection::vec(arb_message(), 0..20)) {
        let original = hashes(&messages);
        let kept = hashes(&deduplicate_messages(messages));

        let mut cursor = 0;
        for hash in &kept {
            let position = original[cursor..].iter().position(|h| h == hash);
            prop_assert!(position.is_some());
            cursor += position.unwrap_or_default() + 1;
        }
    }

    #[test]
    fn merge_is_monotonic(existing in arb_conversation(), fresh in arb_conversation()) {
        let stored = normalize_conversation(&existing, None);
        let merged = normalize_conversation(&fresh, Some(&stored));

        let fresh_unique = deduplicate_messages(fresh.messages.clone()).len();
        prop_assert!(merged.messages.len() >= stored.messages.len().max(fresh_unique));

        let remerged = normalize_conversation(&fresh, Some(&merged));
        prop_assert_eq!(hashes(&remerged.messages), hashes(&merged.messages));
        prop_assert!(remerged.updated_at >= merged.updated_at);
        prop_assert_eq!(remerged.created_at, stored.created_at);
    }
}
