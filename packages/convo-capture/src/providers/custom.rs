//! Custom strategies for providers whose markup the declarative rules
//! cannot pin down.
//!
//! Registered in the default [`StrategyRegistry`](super::StrategyRegistry)
//! under the names in [`names`].

use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;
use url::Url;

use crate::dom::{
    attribute_of, class_name_of, parent_of, parse_selector, query_first_within, text_excluding, text_of,
    Page,
};
use crate::pipeline::role::class_words;
use crate::traits::strategy::{ContentExtractor, IdResolver, RoleDetector, Strategy, TitleResolver};
use crate::types::conversation::Role;
use crate::types::history::UNTITLED_CONVERSATION;

/// Registry names of the built-in custom strategies.
pub mod names {
    pub const DEEPSEEK_ROLE: &str = "deepseek.role";
    pub const DEEPSEEK_CONTENT: &str = "deepseek.content";
    pub const DOUBAO_ID: &str = "doubao.id";
    pub const DOUBAO_ROLE: &str = "doubao.role";
    pub const DOUBAO_TITLE: &str = "doubao.title";
}

static RE_CLOCK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}").unwrap());
static RE_CHAT_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/chat/([a-zA-Z0-9_-]+)").unwrap());
static RE_DOUBAO_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*-\s*豆包.*$").unwrap());

const AVATAR_SELECTOR: &str = r#"[class*="avatar" i], [class*="icon" i], img"#;

/// Lines that are UI chrome rather than message text.
const TOOLBAR_LINES: &[&str] = &[
    "复制", "Copy", "编辑", "Edit", "删除", "Delete", "重试", "Retry", "点赞", "Like", "分享", "Share",
    "更多", "More", "User", "Assistant", "用户", "助手", "DeepSeek",
];

const DEEPSEEK_CONTENT_SELECTORS: &[&str] = &[
    ".message-content",
    r#"[class*="MessageContent"]"#,
    r#"[class*="messageContent"]"#,
    r#"[class*="Content"]"#,
    r#"[class*="content"]"#,
    ".markdown-body",
    ".markdown",
    r#"[class*="Markdown"]"#,
    r#"[class*="markdown"]"#,
    r#"[class*="text-content"]"#,
    r#"[class*="textContent"]"#,
    r#"[class*="Text"]"#,
    r#"[class*="text"]"#,
    "pre",
    "p",
];

const CONTROLS_SELECTOR: &str =
    r#"button, [class*="toolbar" i], [class*="action" i], [class*="btn" i]"#;

const CHROME_SELECTOR: &str = r#"button, [class*="toolbar" i], [class*="action" i], [class*="btn" i], [class*="avatar" i], [class*="icon" i], [class*="timestamp" i], [class*="time" i], [class*="role" i], [class*="author" i]"#;

const DOUBAO_TITLE_SELECTORS: &[&str] = &[
    r#"[class*="conversation-title"]"#,
    r#"[class*="chat-title"]"#,
    r#"[data-testid="conversation-title"]"#,
    ".title",
    "h1",
    "h2",
];

const DOUBAO_NAME: &str = "豆包";

fn role_from_keyword(value: &str) -> Option<Role> {
    let value = value.to_lowercase();
    if value.contains("user") {
        Some(Role::User)
    } else if value.contains("assistant") || value.contains("bot") {
        Some(Role::Assistant)
    } else {
        None
    }
}

/// Probe the first avatar-like child. `markers` identify the assistant in
/// the avatar's class, alt text or image source.
fn role_from_avatar(element: &ElementRef<'_>, markers: &[&str]) -> Option<Role> {
    let avatar = query_first_within(element, AVATAR_SELECTOR)?;
    let class_name = class_name_of(&avatar).to_lowercase();
    let alt = attribute_of(&avatar, "alt").unwrap_or_default().to_lowercase();
    let src = attribute_of(&avatar, "src").unwrap_or_default().to_lowercase();
    let fields = [class_name.as_str(), alt.as_str(), src.as_str()];

    if fields.iter().any(|f| f.contains("user")) {
        return Some(Role::User);
    }
    let assistant = fields.iter().any(|f| markers.iter().any(|m| f.contains(m)))
        || class_words(&class_name).contains(&"ai");
    assistant.then_some(Role::Assistant)
}

/// DeepSeek role fallback: role-ish attributes, class words, avatar.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepSeekRole;

impl Strategy for DeepSeekRole {
    fn name(&self) -> &str {
        names::DEEPSEEK_ROLE
    }
}

impl RoleDetector for DeepSeekRole {
    fn detect(&self, element: &ElementRef<'_>) -> Option<Role> {
        let role_attr = ["data-role", "data-message-role", "data-message-author", "role"]
            .iter()
            .find_map(|name| attribute_of(element, name).filter(|v| !v.is_empty()));
        if let Some(role) = role_attr.as_deref().and_then(role_from_keyword) {
            return Some(role);
        }

        let class_name = class_name_of(element).to_lowercase();
        let words = class_words(&class_name);

        let user_like = words.contains(&"user")
            || class_name.contains("useritem")
            || class_name.contains("usermessage");
        if user_like && !class_name.contains("assistant") {
            return Some(Role::User);
        }

        let assistant_like = ["assistant", "bot", "ai"].iter().any(|w| words.contains(w))
            || ["assistantitem", "assistantmessage", "botmessage", "aimessage"]
                .iter()
                .any(|k| class_name.contains(k));
        if assistant_like {
            return Some(Role::Assistant);
        }

        role_from_avatar(element, &["assistant", "bot", "deepseek"])
    }
}

/// Drop blank lines, toolbar labels and clock times.
pub fn clean_message_text(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !TOOLBAR_LINES.contains(&trimmed) && !RE_CLOCK_LINE.is_match(trimmed)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// DeepSeek content: first content-like child without its controls, else
/// the whole element without any chrome.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepSeekContent;

impl Strategy for DeepSeekContent {
    fn name(&self) -> &str {
        names::DEEPSEEK_CONTENT
    }
}

impl ContentExtractor for DeepSeekContent {
    fn extract(&self, element: &ElementRef<'_>) -> String {
        let controls = parse_selector(CONTROLS_SELECTOR);
        for selector in DEEPSEEK_CONTENT_SELECTORS {
            let Some(content) = query_first_within(element, selector) else {
                continue;
            };
            let text = match &controls {
                Some(controls) => text_excluding(&content, controls),
                None => text_of(&content),
            };
            if !text.trim().is_empty() {
                return clean_message_text(&text);
            }
        }

        let text = match parse_selector(CHROME_SELECTOR) {
            Some(chrome) => text_excluding(element, &chrome),
            None => text_of(element),
        };
        clean_message_text(&text)
    }
}

/// Doubao conversation id from the hash route, the path, or the query.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoubaoId;

impl Strategy for DoubaoId {
    fn name(&self) -> &str {
        names::DOUBAO_ID
    }
}

impl IdResolver for DoubaoId {
    fn resolve(&self, page: &Page) -> Option<String> {
        let url = Url::parse(page.url()).ok()?;
        let capture = |haystack: &str| {
            RE_CHAT_PATH
                .captures(haystack)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        };

        if let Some(id) = url.fragment().and_then(capture) {
            return Some(id);
        }
        if let Some(id) = capture(url.path()) {
            return Some(id);
        }
        url.query_pairs()
            .find(|(key, value)| (key == "chatId" || key == "conversation_id") && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    }
}

/// Doubao role fallback: data-role, class, avatar, parent class, alignment.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoubaoRole;

impl Strategy for DoubaoRole {
    fn name(&self) -> &str {
        names::DOUBAO_ROLE
    }
}

impl RoleDetector for DoubaoRole {
    fn detect(&self, element: &ElementRef<'_>) -> Option<Role> {
        if let Some(role) = attribute_of(element, "data-role").as_deref().and_then(role_from_keyword) {
            return Some(role);
        }

        let class_name = class_name_of(element).to_lowercase();
        if class_name.contains("user") {
            return Some(Role::User);
        }
        if class_name.contains("assistant")
            || class_name.contains("bot")
            || class_words(&class_name).contains(&"ai")
        {
            return Some(Role::Assistant);
        }

        if let Some(role) = role_from_avatar(element, &["bot", DOUBAO_NAME]) {
            return Some(role);
        }

        if let Some(role) = parent_of(element).and_then(|p| role_from_keyword(&class_name_of(&p))) {
            return Some(role);
        }

        role_from_alignment(element)
    }
}

/// Chat bubbles aligned right are the user's.
fn role_from_alignment(element: &ElementRef<'_>) -> Option<Role> {
    let style: String = attribute_of(element, "style")?
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if style.contains("text-align:right") || style.contains("justify-content:flex-end") {
        Some(Role::User)
    } else if style.contains("text-align:left") || style.contains("justify-content:flex-start") {
        Some(Role::Assistant)
    } else {
        None
    }
}

/// Doubao title without the site-name suffix, else the first user message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoubaoTitle;

impl Strategy for DoubaoTitle {
    fn name(&self) -> &str {
        names::DOUBAO_TITLE
    }
}

impl DoubaoTitle {
    fn clean(raw: &str) -> Option<String> {
        let title = RE_DOUBAO_SUFFIX.replace(raw.trim(), "").trim().to_string();
        (!title.is_empty() && title != DOUBAO_NAME).then_some(title)
    }
}

impl TitleResolver for DoubaoTitle {
    fn resolve(&self, page: &Page) -> Option<String> {
        let from_selectors = DOUBAO_TITLE_SELECTORS.iter().find_map(|selector| {
            let element = page.query_first(selector)?;
            Self::clean(&text_of(&element))
        });
        if from_selectors.is_some() {
            return from_selectors;
        }

        if let Some(title) = Self::clean(&page.document_title()) {
            return Some(title);
        }

        let candidates = page.query(r#"[class*="message"], [class*="chat-item"]"#);
        let from_first_question = candidates
            .iter()
            .find(|el| DoubaoRole.detect(el) == Some(Role::User))
            .map(|el| text_of(el).chars().take(100).collect::<String>())
            .filter(|t| !t.is_empty());

        // The bare site name is never a title
        Some(from_first_question.unwrap_or_else(|| UNTITLED_CONVERSATION.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(page: &'a Page, selector: &str) -> ElementRef<'a> {
        page.query_first(selector).unwrap()
    }

    #[test]
    fn test_deepseek_role_attributes_and_class_words() {
        let page = Page::parse(
            "https://chat.deepseek.com/a/chat/s/1",
            r#"<div id="a" role="user-turn"></div>
               <div id="b" class="msg_user-row"></div>
               <div id="c" class="user assistant"></div>
               <div id="d" class="ds-ai-bubble"></div>
               <div id="e" class="row"><img alt="DeepSeek logo" src="/x.png"></div>
               <div id="f" class="row"><span class="Avatar-user"></span></div>
               <div id="g" class="row"></div>"#,
        );
        let role = |id: &str| DeepSeekRole.detect(&first(&page, id));
        assert_eq!(role("#a"), Some(Role::User));
        assert_eq!(role("#b"), Some(Role::User));
        assert_eq!(role("#c"), Some(Role::Assistant));
        assert_eq!(role("#d"), Some(Role::Assistant));
        assert_eq!(role("#e"), Some(Role::Assistant));
        assert_eq!(role("#f"), Some(Role::User));
        assert_eq!(role("#g"), None);
    }

    #[test]
    fn test_clean_message_text_drops_toolbar_lines() {
        let raw = "  Here is the answer\nCopy\n12:30\n\n  second line  \n复制\nDeepSeek";
        assert_eq!(clean_message_text(raw), "Here is the answer\n  second line");
    }

    #[test]
    fn test_deepseek_content_skips_controls() {
        let page = Page::parse(
            "https://chat.deepseek.com",
            "<div class=\"item\"><div class=\"message-content\">Line one\n<button>Copy</button>Line two</div></div>\
             <div class=\"bare\"><span class=\"avatar\">DS</span>Just text<span class=\"timestamp\">09:41</span></div>",
        );
        assert_eq!(DeepSeekContent.extract(&first(&page, ".item")), "Line one\nLine two");
        assert_eq!(DeepSeekContent.extract(&first(&page, ".bare")), "Just text");
    }

    #[test]
    fn test_doubao_id_sources() {
        let resolve = |url: &str| DoubaoId.resolve(&Page::parse(url, ""));
        assert_eq!(resolve("https://www.doubao.com/#/chat/abc_1").as_deref(), Some("abc_1"));
        assert_eq!(resolve("https://www.doubao.com/chat/987-x").as_deref(), Some("987-x"));
        assert_eq!(resolve("https://www.doubao.com/app?chatId=q1").as_deref(), Some("q1"));
        assert_eq!(resolve("https://www.doubao.com/app?conversation_id=q2").as_deref(), Some("q2"));
        assert_eq!(resolve("https://www.doubao.com/"), None);
        assert_eq!(resolve("not a url"), None);
    }

    #[test]
    fn test_doubao_role_chain() {
        let page = Page::parse(
            "https://www.doubao.com/chat/1",
            r#"<div id="a" data-role="bot"></div>
               <div id="b" class="container"></div>
               <div class="user-side"><div id="c" class="bubble"></div></div>
               <div id="d" class="bubble" style="text-align: right"></div>
               <div id="e" class="bubble"><img alt="豆包"></div>"#,
        );
        let role = |id: &str| DoubaoRole.detect(&first(&page, id));
        assert_eq!(role("#a"), Some(Role::Assistant));
        assert_eq!(role("#b"), None);
        assert_eq!(role("#c"), Some(Role::User));
        assert_eq!(role("#d"), Some(Role::User));
        assert_eq!(role("#e"), Some(Role::Assistant));
    }

    #[test]
    fn test_doubao_title() {
        let titled = Page::parse(
            "https://www.doubao.com/chat/1",
            "<html><head><title>Trip plan - 豆包</title></head><body><h1>豆包</h1></body></html>",
        );
        assert_eq!(DoubaoTitle.resolve(&titled).as_deref(), Some("Trip plan"));

        let untitled = Page::parse(
            "https://www.doubao.com/chat/1",
            r#"<html><head><title>豆包</title></head><body><div class="message user-message">What should I pack?</div></body></html>"#,
        );
        assert_eq!(DoubaoTitle.resolve(&untitled).as_deref(), Some("What should I pack?"));
    }

    #[test]
    fn test_doubao_title_never_site_name() {
        let page = Page::parse(
            "https://www.doubao.com/chat/1",
            r#"<html><head><title>豆包</title></head><body><div class="message bot-message">Hello there</div></body></html>"#,
        );
        assert_eq!(DoubaoTitle.resolve(&page).as_deref(), Some(UNTITLED_CONVERSATION));
    }
}
