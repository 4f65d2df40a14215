//! Conversation identity and title resolution.

use regex::Regex;
use tracing::{debug, warn};

use crate::dom::{attribute_of, text_of, Page};
use crate::types::descriptor::{IdRule, IdStrategy, TitleRule, TitleStrategy};
use crate::types::history::UNTITLED_CONVERSATION;

/// Resolve the stable conversation id of `page`.
///
/// A custom resolver's answer is final. Otherwise the URL capture is tried
/// before the page element, and the first non-empty value wins.
pub fn resolve_conversation_id(strategy: &IdStrategy, page: &Page) -> Option<String> {
    match strategy {
        IdStrategy::Custom(resolver) => {
            let id = resolver.resolve(page).filter(|id| !id.trim().is_empty());
            debug!(resolver = resolver.name(), found = id.is_some(), "Custom id resolver");
            id
        }
        IdStrategy::Rule(rule) => resolve_from_rule(rule, page),
    }
}

fn resolve_from_rule(rule: &IdRule, page: &Page) -> Option<String> {
    let pattern = rule.pattern.as_deref().and_then(compile_pattern);

    if let Some(re) = &pattern {
        if let Some(id) = first_capture(re, page.url()) {
            debug!(id = %id, "Conversation id from URL");
            return Some(id);
        }
    }

    let selector = rule.selector.as_deref()?;
    let element = page.query_first(selector)?;
    let raw = match rule.attribute.as_deref() {
        Some(attr) => attribute_of(&element, attr).unwrap_or_default(),
        None => text_of(&element),
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // A pattern that does not match the element value keeps the raw value.
    let id = pattern
        .as_ref()
        .and_then(|re| first_capture(re, raw))
        .unwrap_or_else(|| raw.to_string());
    debug!(id = %id, selector = %selector, "Conversation id from page element");
    Some(id)
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Ignoring invalid id pattern");
            None
        }
    }
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the conversation title of `page`. Never fails.
pub fn resolve_title(strategy: &TitleStrategy, page: &Page) -> String {
    match strategy {
        TitleStrategy::Custom(resolver) => resolver
            .resolve(page)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title(None, page)),
        TitleStrategy::Rule(rule) => {
            let raw = selector_title(rule, page).unwrap_or_else(|| fallback_title(rule.fallback.as_deref(), page));
            let title = strip_affixes(raw, rule);
            if title.is_empty() {
                UNTITLED_CONVERSATION.to_string()
            } else {
                title
            }
        }
    }
}

fn selector_title(rule: &TitleRule, page: &Page) -> Option<String> {
    let defaults = ["title".to_string()];
    let selectors = if rule.selectors.is_empty() {
        &defaults[..]
    } else {
        &rule.selectors[..]
    };

    selectors.iter().find_map(|selector| {
        let element = page.query_first(selector)?;
        let value = match rule.attribute.as_deref() {
            Some(attr) => attribute_of(&element, attr)?,
            None => text_of(&element),
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn fallback_title(configured: Option<&str>, page: &Page) -> String {
    let document_title = page.document_title();
    if !document_title.is_empty() {
        return document_title;
    }
    configured
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED_CONVERSATION)
        .to_string()
}

fn strip_affixes(title: String, rule: &TitleRule) -> String {
    let mut title = title.trim().to_string();
    for prefix in rule.strip_prefixes.iter().filter(|p| !p.is_empty()) {
        if let Some(rest) = title.strip_prefix(prefix.as_str()) {
            title = rest.trim().to_string();
        }
    }
    for suffix in rule.strip_suffixes.iter().filter(|s| !s.is_empty()) {
        if let Some(rest) = title.strip_suffix(suffix.as_str()) {
            title = rest.trim().to_string();
        }
    }
    title
}
