//! Baked-in provider descriptors, used when neither the backend nor the
//! cache can supply any.

use indexmap::IndexMap;

use crate::providers::custom::names;
use crate::providers::registry::ProviderRegistry;
use crate::providers::transport::{OneOrMany, StoredDescriptor, StoredRoleRules, StrategyRegistry};

/// Version tag reported for the built-in set.
pub const BUILTIN_VERSION: &str = "builtin";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn table(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn chatgpt() -> StoredDescriptor {
    StoredDescriptor {
        id: "ChatGPT".into(),
        url_patterns: strings(&["chat.openai.com", "chatgpt.com"]),
        conversation_id_pattern: Some("/c/([a-zA-Z0-9-]+)".into()),
        title_selector: Some(OneOrMany::One("title".into())),
        message_selectors: strings(&["[data-message-author-role]"]),
        content_selectors: strings(&[".markdown", ".message-content", r#"[class*="markdown"]"#]),
        role: Some(StoredRoleRules {
            attribute: Some("data-message-author-role".into()),
            values: table(&[("user", "user"), ("assistant", "assistant")]),
            ..Default::default()
        }),
        fill_selectors: strings(&[
            "#prompt-textarea",
            r#"textarea[placeholder*="Message"]"#,
            r#"textarea[data-id="root"]"#,
            "textarea",
        ]),
        ..Default::default()
    }
}

fn claude() -> StoredDescriptor {
    StoredDescriptor {
        id: "Claude".into(),
        url_patterns: strings(&["claude.ai"]),
        conversation_id_pattern: Some("/chat/([a-zA-Z0-9-]+)".into()),
        title_selector: Some(OneOrMany::One(
            r#"[class*="ChatTitle"], [class*="conversation-title"], h1"#.into(),
        )),
        message_selectors: strings(&[r#"[class*="Message"]"#]),
        content_selectors: strings(&[
            r#"[class*="MessageContent"]"#,
            r#"[class*="message-content"]"#,
            ".markdown",
            r#"[class*="markdown"]"#,
            "p",
        ]),
        role: Some(StoredRoleRules {
            attribute: Some("data-is-user-message".into()),
            values: table(&[("true", "user"), ("false", "assistant")]),
            class_hints: table(&[("user", "user"), ("assistant", "assistant"), ("claude", "assistant")]),
            ..Default::default()
        }),
        fill_selectors: strings(&[
            r#"[contenteditable="true"][placeholder]"#,
            r#"[contenteditable="true"]"#,
            "textarea",
        ]),
        ..Default::default()
    }
}

fn gemini() -> StoredDescriptor {
    StoredDescriptor {
        id: "Gemini".into(),
        url_patterns: strings(&["gemini.google.com"]),
        conversation_id_pattern: Some("/chat/([a-zA-Z0-9_-]+)".into()),
        title_selector: Some(OneOrMany::One(
            r#"[class*="conversation-title"], [class*="chat-title"], h1"#.into(),
        )),
        message_selectors: strings(&[
            r#"[class*="message"]"#,
            r#"[class*="turn"]"#,
            r#"[data-test-id*="message"]"#,
        ]),
        content_selectors: strings(&[
            r#"[class*="message-content"]"#,
            r#"[class*="response-content"]"#,
            r#"[class*="query-content"]"#,
            ".markdown",
            r#"[class*="markdown"]"#,
        ]),
        role: Some(StoredRoleRules {
            class_hints: table(&[
                ("user", "user"),
                ("user-turn", "user"),
                ("user-message", "user"),
                ("model", "assistant"),
                ("assistant", "assistant"),
            ]),
            ..Default::default()
        }),
        fill_selectors: strings(&[r#"[contenteditable="true"]"#, "textarea[placeholder]", "textarea"]),
        ..Default::default()
    }
}

fn deepseek() -> StoredDescriptor {
    StoredDescriptor {
        id: "DeepSeek".into(),
        url_patterns: strings(&["chat.deepseek.com"]),
        conversation_id_pattern: Some("/chat/([a-zA-Z0-9-]+)".into()),
        title_selector: Some(OneOrMany::One(r#".chat-title, [class*="title"], h1, title"#.into())),
        title_suffix_to_remove: strings(&["- DeepSeek"]),
        message_selectors: strings(&[
            ".message-item",
            r#"[class*="MessageItem"]"#,
            r#"[class*="messageItem"]"#,
            r#"[class*="Message"]"#,
            r#"[class*="message"]"#,
            "[data-role]",
        ]),
        content_selectors: strings(&[
            ".message-content",
            r#"[class*="Markdown"]"#,
            r#"[class*="markdown"]"#,
            r#"[class*="Content"]"#,
            "pre",
            "p",
        ]),
        extract_content: Some(names::DEEPSEEK_CONTENT.into()),
        role: Some(StoredRoleRules {
            attribute: Some("data-role".into()),
            values: table(&[("user", "user"), ("assistant", "assistant")]),
            class_hints: table(&[
                ("user", "user"),
                ("assistant", "assistant"),
                ("bot", "assistant"),
                ("=ai", "assistant"),
            ]),
            fallback: Some(names::DEEPSEEK_ROLE.into()),
            ..Default::default()
        }),
        fill_selectors: strings(&[r#"textarea[placeholder*="输入"]"#, "textarea", r#"[contenteditable="true"]"#]),
        ..Default::default()
    }
}

fn doubao() -> StoredDescriptor {
    StoredDescriptor {
        id: "Doubao".into(),
        url_patterns: strings(&["doubao.com"]),
        conversation_id_pattern: Some("/chat/([a-zA-Z0-9_-]+)".into()),
        get_conversation_id: Some(names::DOUBAO_ID.into()),
        title_selector: Some(OneOrMany::One(
            r#"[class*="conversation-title"], [class*="chat-title"], [data-testid="conversation-title"], .title, h1, h2, title"#.into(),
        )),
        get_title: Some(names::DOUBAO_TITLE.into()),
        message_selectors: strings(&[r#"[class*="message"]"#, r#"[class*="chat-item"]"#, "[data-role]"]),
        content_selectors: strings(&[
            r#"[class*="message-content"]"#,
            r#"[class*="content"]"#,
            r#"[class*="text"]"#,
            ".markdown",
            r#"[class*="markdown"]"#,
            "p",
        ]),
        role: Some(StoredRoleRules {
            attribute: Some("data-role".into()),
            values: table(&[("user", "user"), ("assistant", "assistant")]),
            class_hints: table(&[
                ("user-message", "user"),
                ("user", "user"),
                ("assistant", "assistant"),
                ("bot", "assistant"),
                ("=ai", "assistant"),
            ]),
            fallback: Some(names::DOUBAO_ROLE.into()),
            ..Default::default()
        }),
        fill_selectors: strings(&[
            r#"textarea[placeholder*="输入"]"#,
            r#"textarea[placeholder*="问"]"#,
            r#"[contenteditable="true"][placeholder*="输入"]"#,
            r#"[contenteditable="true"][placeholder*="问"]"#,
            "textarea",
            r#"[contenteditable="true"]"#,
            r#"input[type="text"]"#,
        ]),
        ..Default::default()
    }
}

/// The five built-in descriptors in transport form, in precedence order.
pub fn builtin_descriptors() -> Vec<StoredDescriptor> {
    vec![chatgpt(), claude(), gemini(), deepseek(), doubao()]
}

/// Registry of the built-in descriptors, resolved against `strategies`.
pub fn builtin_registry(strategies: &StrategyRegistry) -> ProviderRegistry {
    ProviderRegistry::new(
        builtin_descriptors()
            .into_iter()
            .map(|stored| stored.into_descriptor(strategies))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::descriptor::{ContentStrategy, IdStrategy, TitleStrategy};

    #[test]
    fn test_builtin_order_and_resolution() {
        let registry = builtin_registry(&StrategyRegistry::with_builtins());
        assert_eq!(registry.ids(), vec!["ChatGPT", "Claude", "Gemini", "DeepSeek", "Doubao"]);

        let resolve = |url: &str| registry.resolve(url).map(|d| d.id.clone());
        assert_eq!(resolve("https://chatgpt.com/c/1").as_deref(), Some("ChatGPT"));
        assert_eq!(resolve("https://chat.openai.com/c/1").as_deref(), Some("ChatGPT"));
        assert_eq!(resolve("https://claude.ai/chat/1").as_deref(), Some("Claude"));
        assert_eq!(resolve("https://gemini.google.com/app").as_deref(), Some("Gemini"));
        assert_eq!(resolve("https://chat.deepseek.com/a/chat/s/1").as_deref(), Some("DeepSeek"));
        assert_eq!(resolve("https://www.doubao.com/chat/1").as_deref(), Some("Doubao"));
        assert_eq!(resolve("https://example.com"), None);
    }

    #[test]
    fn test_custom_strategies_are_wired() {
        let registry = builtin_registry(&StrategyRegistry::with_builtins());

        let deepseek = registry.get("DeepSeek").unwrap();
        assert!(matches!(&deepseek.content, ContentStrategy::Custom(c) if c.name() == names::DEEPSEEK_CONTENT));
        assert_eq!(deepseek.role.fallback.as_ref().map(|f| f.name()), Some(names::DEEPSEEK_ROLE));

        let doubao = registry.get("Doubao").unwrap();
        assert!(matches!(&doubao.conversation_id, IdStrategy::Custom(_)));
        assert!(matches!(&doubao.title, TitleStrategy::Custom(_)));

        let claude = registry.get("Claude").unwrap();
        assert!(matches!(&claude.title, TitleStrategy::Rule(rule) if rule.selectors.len() == 3));
    }

    #[test]
    fn test_builtins_survive_json_round_trip() {
        let values: Vec<_> = builtin_descriptors()
            .into_iter()
            .map(|d| serde_json::to_value(d).unwrap())
            .collect();
        assert_eq!(values[0]["conversationIdPattern"], "/c/([a-zA-Z0-9-]+)");
        let decoded = crate::providers::transport::decode_descriptors(values, &StrategyRegistry::with_builtins());
        assert_eq!(decoded.len(), 5);
    }

    #[test]
    fn test_without_strategies_custom_fields_degrade() {
        let registry = builtin_registry(&StrategyRegistry::new());
        let doubao = registry.get("Doubao").unwrap();
        assert!(matches!(&doubao.conversation_id, IdStrategy::Rule(rule) if rule.pattern.is_some()));
    }
}
