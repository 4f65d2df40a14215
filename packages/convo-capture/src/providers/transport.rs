//! Serializable provider descriptors and the named strategy registry.
//!
//! Descriptors travel as JSON (from `GET /providers` and the local cache).
//! Function-valued fields are strategy names resolved against a
//! [`StrategyRegistry`]; an unknown name drops that one field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::DescriptorError;
use crate::providers::custom::{names, DeepSeekContent, DeepSeekRole, DoubaoId, DoubaoRole, DoubaoTitle};
use crate::traits::strategy::{
    ContentExtractor, Custom, IdResolver, MessageFilter, MessageFinder, RoleDetector, Strategy,
    TimestampParser, TitleResolver,
};
use crate::types::conversation::Role;
use crate::types::descriptor::{
    ContentStrategy, IdRule, IdStrategy, MessageStrategy, ProviderDescriptor, RoleRules, TimestampRule,
    TitleRule, TitleStrategy,
};

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Transport form of a [`ProviderDescriptor`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDescriptor {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url_patterns: Vec<String>,

    /// Older descriptors carry patterns here instead of `urlPatterns`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id_attribute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_conversation_id: Option<String>,

    /// Comma-separated string or list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_selector: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_attribute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_fallback: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub title_prefix_to_remove: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub title_suffix_to_remove: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_selectors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find_message_elements: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_filter: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_selectors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<StoredRoleRules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<StoredTimestampRule>,

    #[serde(default)]
    pub fill_selectors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRoleRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Attribute value to role name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub values: IndexMap<String, String>,

    /// Class keyword to role name (`=word` for a whole class word)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub class_hints: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredTimestampRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
}

impl StoredDescriptor {
    /// Decode one descriptor from JSON.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DescriptorError> {
        let stored: StoredDescriptor = serde_json::from_value(value)?;
        if stored.id.trim().is_empty() {
            return Err(DescriptorError::MissingId);
        }
        Ok(stored)
    }

    /// Resolve into a runnable descriptor, looking strategy names up in
    /// `strategies`.
    pub fn into_descriptor(self, strategies: &StrategyRegistry) -> ProviderDescriptor {
        let id = self.id;

        let mut url_patterns = self.url_patterns;
        if url_patterns.is_empty() {
            url_patterns = self.matches.map(OneOrMany::into_vec).unwrap_or_default();
        }

        let conversation_id = match strategies.lookup(&id, "getConversationId", &strategies.ids, self.get_conversation_id) {
            Some(resolver) => IdStrategy::Custom(resolver),
            None => IdStrategy::Rule(IdRule {
                pattern: self.conversation_id_pattern,
                selector: self.conversation_id_selector,
                attribute: self.conversation_id_attribute,
            }),
        };

        let title = match strategies.lookup(&id, "getTitle", &strategies.titles, self.get_title) {
            Some(resolver) => TitleStrategy::Custom(resolver),
            None => TitleStrategy::Rule(TitleRule {
                selectors: split_title_selectors(self.title_selector),
                attribute: self.title_attribute,
                fallback: self.title_fallback,
                strip_prefixes: self.title_prefix_to_remove,
                strip_suffixes: self.title_suffix_to_remove,
            }),
        };

        let messages = match strategies.lookup(&id, "findMessageElements", &strategies.finders, self.find_message_elements) {
            Some(finder) => MessageStrategy::Custom(finder),
            None => MessageStrategy::Selectors(self.message_selectors),
        };

        let message_filter = strategies.lookup(&id, "messageFilter", &strategies.filters, self.message_filter);

        let content = match strategies.lookup(&id, "extractContent", &strategies.extractors, self.extract_content) {
            Some(extractor) => ContentStrategy::Custom(extractor),
            None => ContentStrategy::Selectors(self.content_selectors),
        };

        let role = self
            .role
            .map(|stored| RoleRules {
                attribute: stored.attribute,
                values: parse_role_table(&id, stored.values),
                class_hints: parse_role_table(&id, stored.class_hints),
                fallback: strategies.lookup(&id, "role.fallback", &strategies.roles, stored.fallback),
            })
            .unwrap_or_default();

        let timestamp = self.timestamp.map(|stored| TimestampRule {
            selector: stored.selector,
            attribute: stored.attribute,
            parser: strategies.lookup(&id, "timestamp.parser", &strategies.parsers, stored.parser),
        });

        ProviderDescriptor {
            id,
            url_patterns,
            conversation_id,
            title,
            messages,
            message_filter,
            role,
            content,
            timestamp,
            fill_selectors: self.fill_selectors,
        }
    }
}

fn split_title_selectors(selectors: Option<OneOrMany>) -> Vec<String> {
    selectors
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_role_table(provider: &str, table: IndexMap<String, String>) -> IndexMap<String, Role> {
    table
        .into_iter()
        .filter_map(|(key, value)| match Role::parse(&value) {
            Some(role) => Some((key, role)),
            None => {
                warn!(provider = %provider, key = %key, value = %value, "Dropping unknown role in descriptor table");
                None
            }
        })
        .collect()
}

/// Decode a transported descriptor list, skipping entries that fail.
pub fn decode_descriptors(values: Vec<serde_json::Value>, strategies: &StrategyRegistry) -> Vec<ProviderDescriptor> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match StoredDescriptor::from_json(value) {
            Ok(stored) => Some(stored.into_descriptor(strategies)),
            Err(e) => {
                warn!(position, error = %e, "Skipping malformed provider descriptor");
                None
            }
        })
        .collect()
}

/// Custom strategies available to transported descriptors, by name.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    ids: HashMap<String, Custom<dyn IdResolver>>,
    titles: HashMap<String, Custom<dyn TitleResolver>>,
    finders: HashMap<String, Custom<dyn MessageFinder>>,
    filters: HashMap<String, Custom<dyn MessageFilter>>,
    roles: HashMap<String, Custom<dyn RoleDetector>>,
    extractors: HashMap<String, Custom<dyn ContentExtractor>>,
    parsers: HashMap<String, Custom<dyn TimestampParser>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in provider strategies.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_role_detector(names::DEEPSEEK_ROLE, DeepSeekRole)
            .with_content_extractor(names::DEEPSEEK_CONTENT, DeepSeekContent)
            .with_id_resolver(names::DOUBAO_ID, DoubaoId)
            .with_role_detector(names::DOUBAO_ROLE, DoubaoRole)
            .with_title_resolver(names::DOUBAO_TITLE, DoubaoTitle)
    }

    pub fn with_id_resolver(mut self, name: impl Into<String>, strategy: impl IdResolver + 'static) -> Self {
        self.ids.insert(name.into(), strategy.into());
        self
    }

    pub fn with_title_resolver(mut self, name: impl Into<String>, strategy: impl TitleResolver + 'static) -> Self {
        self.titles.insert(name.into(), strategy.into());
        self
    }

    pub fn with_message_finder(mut self, name: impl Into<String>, strategy: impl MessageFinder + 'static) -> Self {
        self.finders.insert(name.into(), strategy.into());
        self
    }

    pub fn with_message_filter(mut self, name: impl Into<String>, strategy: impl MessageFilter + 'static) -> Self {
        self.filters.insert(name.into(), strategy.into());
        self
    }

    pub fn with_role_detector(mut self, name: impl Into<String>, strategy: impl RoleDetector + 'static) -> Self {
        self.roles.insert(name.into(), strategy.into());
        self
    }

    pub fn with_content_extractor(
        mut self,
        name: impl Into<String>,
        strategy: impl ContentExtractor + 'static,
    ) -> Self {
        self.extractors.insert(name.into(), strategy.into());
        self
    }

    pub fn with_timestamp_parser(
        mut self,
        name: impl Into<String>,
        strategy: impl TimestampParser + 'static,
    ) -> Self {
        self.parsers.insert(name.into(), strategy.into());
        self
    }

    pub fn role_detector(&self, name: &str) -> Option<Custom<dyn RoleDetector>> {
        self.roles.get(name).cloned()
    }

    pub fn content_extractor(&self, name: &str) -> Option<Custom<dyn ContentExtractor>> {
        self.extractors.get(name).cloned()
    }

    pub fn id_resolver(&self, name: &str) -> Option<Custom<dyn IdResolver>> {
        self.ids.get(name).cloned()
    }

    pub fn title_resolver(&self, name: &str) -> Option<Custom<dyn TitleResolver>> {
        self.titles.get(name).cloned()
    }

    fn lookup<T: ?Sized + Strategy>(
        &self,
        provider: &str,
        field: &str,
        table: &HashMap<String, Custom<T>>,
        name: Option<String>,
    ) -> Option<Custom<T>> {
        let name = name.filter(|n| !n.trim().is_empty())?;
        let found = table.get(name.trim()).cloned();
        if found.is_none() {
            warn!(provider = %provider, field = %field, strategy = %name, "Unknown strategy, field disabled");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_descriptor() {
        let value = json!({
            "id": "Claude",
            "urlPatterns": ["claude.ai"],
            "conversationIdPattern": "/chat/([a-zA-Z0-9-]+)",
            "titleSelector": "[class*=\"ChatTitle\"], h1",
            "titlePrefixToRemove": ["Claude -"],
            "messageSelectors": ["[class*=\"Message\"]"],
            "contentSelectors": [".markdown"],
            "role": {
                "attribute": "data-is-user-message",
                "values": {"true": "user", "false": "assistant"},
                "classHints": {"claude": "assistant"}
            },
            "timestamp": {"selector": "time"},
            "fillSelectors": ["textarea"]
        });
        let descriptor = StoredDescriptor::from_json(value)
            .unwrap()
            .into_descriptor(&StrategyRegistry::with_builtins());

        assert_eq!(descriptor.id, "Claude");
        assert_eq!(descriptor.url_patterns, vec!["claude.ai"]);
        match &descriptor.title {
            TitleStrategy::Rule(rule) => {
                assert_eq!(rule.selectors, vec!["[class*=\"ChatTitle\"]", "h1"]);
                assert_eq!(rule.strip_prefixes, vec!["Claude -"]);
            }
            other => panic!("unexpected title strategy: {:?}", other),
        }
        assert_eq!(descriptor.role.values.get("true"), Some(&Role::User));
        assert_eq!(descriptor.role.class_hints.get("claude"), Some(&Role::Assistant));
        assert!(descriptor.timestamp.is_some());
        assert_eq!(descriptor.fill_selectors, vec!["textarea"]);
    }

    #[test]
    fn test_named_strategies_resolve_and_unknown_degrade() {
        let value = json!({
            "id": "Doubao",
            "matches": "doubao.com",
            "getConversationId": "doubao.id",
            "getTitle": "no.such.title",
            "extractContent": "not a function at all",
            "messageSelectors": ["[data-role]"],
            "role": {"attribute": "data-role", "values": {"user": "user", "x": "robot"}, "fallback": "doubao.role"}
        });
        let descriptor = StoredDescriptor::from_json(value)
            .unwrap()
            .into_descriptor(&StrategyRegistry::with_builtins());

        assert_eq!(descriptor.url_patterns, vec!["doubao.com"]);
        assert!(matches!(&descriptor.conversation_id, IdStrategy::Custom(c) if c.name() == "doubao.id"));
        assert!(matches!(descriptor.title, TitleStrategy::Rule(_)));
        assert!(matches!(descriptor.content, ContentStrategy::Selectors(ref s) if s.is_empty()));
        assert_eq!(descriptor.role.values.len(), 1);
        assert_eq!(descriptor.role.fallback.as_ref().map(|f| f.name()), Some("doubao.role"));
    }

    #[test]
    fn test_decode_skips_malformed_entries() {
        let values = vec![
            json!({"id": "A", "urlPatterns": ["a.example"]}),
            json!({"id": "", "urlPatterns": ["b.example"]}),
            json!({"id": "C", "urlPatterns": 42}),
            json!("not an object"),
            json!({"id": "D", "matches": ["d.example", "/d\\.test/i"]}),
        ];
        let decoded = decode_descriptors(values, &StrategyRegistry::new());
        let ids: Vec<_> = decoded.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "D"]);
        assert_eq!(decoded[1].url_patterns.len(), 2);
    }
}
