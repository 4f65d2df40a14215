//! Per-message role detection.
//!
//! Stages run in a fixed order and the first one that yields a role wins:
//!
//! 1. the descriptor's role attribute, looked up in its value table
//! 2. the descriptor's class-hint table
//! 3. generic `data-role` / `data-message-role` attribute probe
//! 4. generic class probe
//! 5. the descriptor's custom fallback
//!
//! When every stage fails the engine assigns the role positionally.

use indexmap::IndexMap;
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;
use tracing::trace;

use crate::dom::{attribute_of, class_name_of};
use crate::types::conversation::Role;
use crate::types::descriptor::RoleRules;

/// Prefix marking a class hint that only matches a whole class word.
pub const WHOLE_WORD_HINT: char = '=';

static RE_CLASS_WORD_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-_]+").unwrap());

const GENERIC_ROLE_ATTRIBUTES: [&str; 2] = ["data-role", "data-message-role"];

const GENERIC_CLASS_HINTS: [(&str, Role); 3] = [
    ("user", Role::User),
    ("assistant", Role::Assistant),
    ("bot", Role::Assistant),
];

/// Run the detection chain for one element.
pub fn detect_role(element: &ElementRef<'_>, rules: &RoleRules) -> Option<Role> {
    if let Some(role) = from_attribute_table(element, rules) {
        trace!(role = %role, "Role from attribute table");
        return Some(role);
    }

    let class_name = class_name_of(element).to_lowercase();

    if let Some(role) = match_class_hints(&class_name, hint_pairs(&rules.class_hints)) {
        trace!(role = %role, "Role from class hints");
        return Some(role);
    }

    if let Some(role) = from_generic_attributes(element) {
        trace!(role = %role, "Role from generic attribute");
        return Some(role);
    }

    if let Some(role) = match_class_hints(&class_name, GENERIC_CLASS_HINTS.iter().map(|(k, r)| (*k, *r))) {
        trace!(role = %role, "Role from generic class probe");
        return Some(role);
    }

    let fallback = rules.fallback.as_ref()?;
    let role = fallback.detect(element);
    trace!(strategy = fallback.name(), found = role.is_some(), "Role from custom fallback");
    role
}

fn from_attribute_table(element: &ElementRef<'_>, rules: &RoleRules) -> Option<Role> {
    let attribute = rules.attribute.as_deref()?;
    let value = attribute_of(element, attribute)?;
    let value = value.trim();
    rules
        .values
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(value))
        .map(|(_, role)| *role)
}

fn from_generic_attributes(element: &ElementRef<'_>) -> Option<Role> {
    GENERIC_ROLE_ATTRIBUTES.iter().find_map(|attr| {
        let value = attribute_of(element, attr)?.to_lowercase();
        if value.contains("user") {
            Some(Role::User)
        } else if value.contains("assistant") || value.contains("bot") {
            Some(Role::Assistant)
        } else {
            None
        }
    })
}

fn hint_pairs(hints: &IndexMap<String, Role>) -> impl Iterator<Item = (&str, Role)> + '_ {
    hints.iter().map(|(keyword, role)| (keyword.as_str(), *role))
}

/// Words of a class string, split on whitespace, `-` and `_`.
pub fn class_words(class_name: &str) -> Vec<&str> {
    RE_CLASS_WORD_SPLIT.split(class_name).filter(|w| !w.is_empty()).collect()
}

/// Match a lower-cased class string against `(keyword, role)` hints.
///
/// A keyword equal to a whole class token wins outright (first in table
/// order). Otherwise the longest keyword contained anywhere in the class
/// string wins, ties going to table order. A keyword written as `=word`
/// only matches a whole class word (`chat-ai-row`, not `container`).
pub fn match_class_hints<'k>(
    class_name: &str,
    hints: impl Iterator<Item = (&'k str, Role)>,
) -> Option<Role> {
    if class_name.is_empty() {
        return None;
    }

    let words = class_words(class_name);
    let mut best: Option<(usize, Role)> = None;
    for (keyword, role) in hints {
        let keyword = keyword.to_lowercase();
        let (keyword, whole_word) = match keyword.strip_prefix(WHOLE_WORD_HINT) {
            Some(word) => (word, true),
            None => (keyword.as_str(), false),
        };
        if keyword.is_empty() {
            continue;
        }
        if class_name.split_whitespace().any(|token| token == keyword) {
            return Some(role);
        }
        let contained = if whole_word {
            words.contains(&keyword)
        } else {
            class_name.contains(keyword)
        };
        if contained && best.map_or(true, |(len, _)| keyword.len() > len) {
            best = Some((keyword.len(), role));
        }
    }
    best.map(|(_, role)| role)
}
