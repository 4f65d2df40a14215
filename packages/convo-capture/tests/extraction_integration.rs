//! Integration tests for extraction against the built-in providers.
//!
//! These tests run the full flow:
//! 1. Resolve the active descriptor from the page URL
//! 2. Extract the conversation
//! 3. Merge and persist through the sync service
//! 4. Push to the (mock) backend

use std::sync::Arc;

use convo_capture::{
    builtin_registry, extract_page, fill_for_descriptor, render_template,
    testing::{chat_page_html, MockBackend},
    ExtractionError, FileStore, KeyValueStore, MemoryStore, Page, ProviderRegistry, Role, StrategyRegistry,
    SyncConfig, SyncError, SyncService, TemplateVariable,
};

fn registry() -> ProviderRegistry {
    builtin_registry(&StrategyRegistry::with_builtins())
}

#[test]
fn test_chatgpt_page_extracts_with_attribute_roles() {
    let html = chat_page_html(
        "Borrow checker help",
        &[("user", "Why does this not compile?"), ("assistant", "Because of a mutable borrow.")],
    );
    let page = Page::parse("https://chatgpt.com/c/6f1e-22aa", &html);

    let conversation = extract_page(&registry(), &page).unwrap();
    assert_eq!(conversation.provider, "ChatGPT");
    assert_eq!(conversation.conversation_id, "6f1e-22aa");
    assert_eq!(conversation.title, "Borrow checker help");
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].role, Role::User);
    assert_eq!(conversation.messages[1].content, "Because of a mutable borrow.");
}

#[test]
fn test_claude_page_uses_boolean_role_attribute() {
    let html = r#"<html><head><title>Claude</title></head><body>
        <h1>Trip planning</h1>
        <div class="font-user-Message" data-is-user-message="true"><p>Plan a weekend in Lisbon</p></div>
        <div class="font-claude-Message" data-is-user-message="false"><div class="markdown">Day one: Alfama.</div></div>
    </body></html>"#;
    let page = Page::parse("https://claude.ai/chat/0b9c-11", html);

    let conversation = extract_page(&registry(), &page).unwrap();
    assert_eq!(conversation.provider, "Claude");
    assert_eq!(conversation.title, "Trip planning");
    let roles: Vec<_> = conversation.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(conversation.messages[1].content, "Day one: Alfama.");
}

#[test]
fn test_doubao_custom_id_and_title() {
    let html = r#"<html><head><title>Packing list - 豆包</title></head><body>
        <div class="chat-item" data-role="user"><span class="text">What should I pack?</span></div>
        <div class="chat-item" data-role="assistant"><span class="text">Layers and an umbrella.</span></div>
    </body></html>"#;
    let page = Page::parse("https://www.doubao.com/thread?chatId=77aa", html);

    let conversation = extract_page(&registry(), &page).unwrap();
    assert_eq!(conversation.provider, "Doubao");
    assert_eq!(conversation.conversation_id, "77aa");
    assert_eq!(conversation.title, "Packing list");
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].role, Role::User);
    assert_eq!(conversation.messages[1].role, Role::Assistant);
}

#[test]
fn test_doubao_data_role_beats_container_class() {
    let html = r#"<html><head><title>Weekend - 豆包</title></head><body>
        <div class="chat-item-container" data-role="user"><span class="text">Any hikes nearby?</span></div>
        <div class="chat-item-container" data-role="assistant"><span class="text">Try the ridge trail.</span></div>
    </body></html>"#;
    let page = Page::parse("https://www.doubao.com/chat/77aa", html);

    let conversation = extract_page(&registry(), &page).unwrap();
    let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

#[test]
fn test_doubao_site_name_title_becomes_untitled() {
    let html = r#"<html><head><title>豆包</title></head><body>
        <div class="chat-item" data-role="assistant"><span class="text">How can I help?</span></div>
    </body></html>"#;
    let page = Page::parse("https://www.doubao.com/chat/88bb", html);

    let conversation = extract_page(&registry(), &page).unwrap();
    assert_eq!(conversation.title, "Untitled Conversation");
}

#[test]
fn test_missing_messages_surface_as_extraction_error() {
    let page = Page::parse("https://chatgpt.com/c/abc", "<html><body><main></main></body></html>");
    let err = extract_page(&registry(), &page).unwrap_err();
    assert!(matches!(err, SyncError::Extraction(ExtractionError::NoMessages)));
}

#[tokio::test]
async fn test_capture_twice_then_sync_all() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("capture.json")));
    let backend = Arc::new(MockBackend::new());
    let sync = SyncService::new(store.clone(), backend.clone(), SyncConfig::default().with_auto_sync(true));

    let first = Page::parse(
        "https://chatgpt.com/c/abc",
        &chat_page_html("Chat", &[("user", "Hi"), ("assistant", "Hello")]),
    );
    let outcome = sync.extract_and_capture(&registry(), &first).await.unwrap();
    assert!(outcome.synced);
    assert_eq!(outcome.message_count, 2);

    let second = Page::parse(
        "https://chatgpt.com/c/abc",
        &chat_page_html("Chat", &[("user", "Hi"), ("assistant", "Hello"), ("user", "Thanks")]),
    );
    let outcome = sync.extract_and_capture(&registry(), &second).await.unwrap();
    assert_eq!(outcome.message_count, 3);

    let stored = store.get("history_ChatGPT_abc").await.unwrap().unwrap();
    assert_eq!(stored["messages"].as_array().map(Vec::len), Some(3));

    let report = sync.sync_all().await.unwrap();
    assert_eq!(report.pushed, 1);
    assert_eq!(backend.pushed().len(), 3);
}

#[tokio::test]
async fn test_memory_store_backs_service() {
    let sync = SyncService::new(MemoryStore::new(), MockBackend::new(), SyncConfig::default());
    let page = Page::parse("https://chatgpt.com/c/m1", &chat_page_html("T", &[("user", "Hi")]));
    let outcome = sync.extract_and_capture(&registry(), &page).await.unwrap();
    assert!(outcome.saved);
    assert!(!outcome.synced);
}

#[test]
fn test_render_and_fill_on_provider_page() {
    let registry = registry();
    let mut page = Page::parse(
        "https://chatgpt.com/",
        r#"<form><textarea id="prompt-textarea" placeholder="Message ChatGPT"></textarea></form>"#,
    );
    let descriptor = registry.resolve(page.url()).unwrap();

    let content = render_template(
        "Review this {{ lang }} code",
        &[TemplateVariable::new("lang").with_default("Rust")],
        &Default::default(),
    );
    let handle = fill_for_descriptor(&mut page, &descriptor, &content).unwrap();

    let input = page.element_at(handle.ordinal).unwrap();
    assert_eq!(page.value_of(&input), "Review this Rust code");
    assert_eq!(page.input_events().len(), 3);
}
