//! The host document tree the engine reads from.
//!
//! A [`Page`] is a parsed HTML document plus the URL it was loaded from.
//! The engine only ever reads it: selector queries, text content,
//! attributes and class names. Writes go through the input-fill overlay
//! (see [`crate::fill`]) and never touch the parsed tree.

use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use tracing::warn;

use crate::traits::input::InputEvent;

/// A parsed page.
pub struct Page {
    url: String,
    html: Html,
    pub(crate) filled: HashMap<usize, String>,
    pub(crate) events: Vec<InputEvent>,
}

impl Page {
    /// Parse a full HTML document loaded from `url`.
    pub fn parse(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            html: Html::parse_document(html),
            filled: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// The URL of the page at load time.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The document's own `<title>`, trimmed. Empty when absent.
    pub fn document_title(&self) -> String {
        self.query_first("title")
            .map(|el| text_of(&el))
            .unwrap_or_default()
    }

    /// All elements matching `selector`, in document order.
    ///
    /// An unparseable selector matches nothing.
    pub fn query(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match parse_selector(selector) {
            Some(sel) => self.html.select(&sel).collect(),
            None => Vec::new(),
        }
    }

    /// First element matching `selector`.
    pub fn query_first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let sel = parse_selector(selector)?;
        self.html.select(&sel).next()
    }

    /// Descendants of `element` matching `selector`, in document order.
    pub fn query_scoped<'a>(&self, element: &ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
        query_within(element, selector)
    }

    /// Position of `element` in a pre-order walk of the whole tree.
    ///
    /// Stable for the lifetime of the page; used as element identity by
    /// handles that must outlive a borrow of the page.
    pub fn ordinal_of(&self, element: &ElementRef<'_>) -> Option<usize> {
        let target = element.id();
        self.html.tree.root().descendants().position(|node| node.id() == target)
    }

    /// Element at a pre-order position, if that node is an element.
    pub fn element_at(&self, ordinal: usize) -> Option<ElementRef<'_>> {
        self.html
            .tree
            .root()
            .descendants()
            .nth(ordinal)
            .and_then(ElementRef::wrap)
    }

    /// Current value of an input control, including content written
    /// through the fill overlay.
    pub fn value_of(&self, element: &ElementRef<'_>) -> String {
        if let Some(value) = self.ordinal_of(element).and_then(|o| self.filled.get(&o)) {
            return value.clone();
        }
        match element.value().name() {
            "input" => attribute_of(element, "value").unwrap_or_default(),
            _ => text_of(element),
        }
    }

    /// Synthetic notifications dispatched by fills, oldest first.
    pub fn input_events(&self) -> &[InputEvent] {
        &self.events
    }
}

/// Parse a CSS selector, logging and discarding invalid ones.
pub fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = %selector, error = %e, "Ignoring invalid selector");
            None
        }
    }
}

/// Descendants of `element` matching `selector`.
pub fn query_within<'a>(element: &ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match parse_selector(selector) {
        Some(sel) => element.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// First descendant of `element` matching `selector`.
pub fn query_first_within<'a>(element: &ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let sel = parse_selector(selector)?;
    element.select(&sel).next()
}

/// Text content of an element, trimmed.
pub fn text_of(element: &ElementRef<'_>) -> String {
    raw_text_of(element).trim().to_string()
}

/// Text content of an element exactly as it appears in the tree.
pub fn raw_text_of(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

/// Attribute value, if present.
pub fn attribute_of(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

/// Raw `class` attribute, empty when absent.
pub fn class_name_of(element: &ElementRef<'_>) -> String {
    element.value().attr("class").unwrap_or_default().to_string()
}

/// Parent element, skipping the document node.
pub fn parent_of<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Text content of `element`, leaving out every subtree whose root
/// matches `excluded`.
pub fn text_excluding(element: &ElementRef<'_>, excluded: &Selector) -> String {
    let mut out = String::new();
    collect_text(element, excluded, &mut out);
    out
}

fn collect_text(element: &ElementRef<'_>, excluded: &Selector, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !excluded.matches(&child_el) {
                        collect_text(&child_el, excluded, out);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html><head><title> Chat Title </title></head>
        <body>
          <div class="msg user-msg" data-role="user"><p>Hi <button>Copy</button>there</p></div>
          <div class="msg" data-role="assistant"><span class="markdown">Hello</span></div>
          <input id="q" value="draft">
        </body></html>
    "#;

    #[test]
    fn test_query_in_document_order() {
        let page = Page::parse("https://x/c/1", HTML);
        let found = page.query("[data-role]");
        assert_eq!(found.len(), 2);
        assert_eq!(attribute_of(&found[0], "data-role").as_deref(), Some("user"));
        assert_eq!(class_name_of(&found[0]), "msg user-msg");
    }

    #[test]
    fn test_contains_operator_and_invalid_selector() {
        let page = Page::parse("https://x", HTML);
        assert_eq!(page.query(r#"[class*="user"]"#).len(), 1);
        assert!(page.query("div[[").is_empty());
        assert!(page.query_first(":::").is_none());
    }

    #[test]
    fn test_scoped_query_and_text() {
        let page = Page::parse("https://x", HTML);
        let second = page.query("[data-role]")[1];
        let inner = page.query_scoped(&second, ".markdown");
        assert_eq!(inner.len(), 1);
        assert_eq!(text_of(&inner[0]), "Hello");
        assert_eq!(page.document_title(), "Chat Title");
    }

    #[test]
    fn test_text_excluding_skips_subtrees() {
        let page = Page::parse("https://x", HTML);
        let first = page.query("[data-role]")[0];
        let buttons = Selector::parse("button").unwrap();
        assert_eq!(text_excluding(&first, &buttons), "Hi there");
        assert_eq!(text_of(&first), "Hi Copythere");
    }

    #[test]
    fn test_value_of_reads_input_value() {
        let page = Page::parse("https://x", HTML);
        let input = page.query_first("#q").unwrap();
        assert_eq!(page.value_of(&input), "draft");
        assert_eq!(parent_of(&input).map(|p| p.value().name().to_string()).as_deref(), Some("body"));
    }
}
