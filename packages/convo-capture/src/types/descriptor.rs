//! Provider descriptors: where things live on one provider's page.
//!
//! A descriptor is data. Each capability is either a declarative rule
//! (selector chains, attribute and class-hint tables) or a [`Custom`]
//! strategy registered in-process.

use indexmap::IndexMap;

use crate::traits::strategy::{
    ContentExtractor, Custom, IdResolver, MessageFilter, MessageFinder, RoleDetector,
    TimestampParser, TitleResolver,
};
use crate::types::conversation::Role;

/// Everything the engine needs to extract a conversation from one provider.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Stable provider name, unique within a registry
    pub id: String,

    /// Substrings or `/regex/flags` literals; any match activates the descriptor
    pub url_patterns: Vec<String>,

    pub conversation_id: IdStrategy,

    pub title: TitleStrategy,

    pub messages: MessageStrategy,

    /// Optional predicate applied to every discovered element
    pub message_filter: Option<Custom<dyn MessageFilter>>,

    pub role: RoleRules,

    pub content: ContentStrategy,

    pub timestamp: Option<TimestampRule>,

    /// Input locators, most specific first
    pub fill_selectors: Vec<String>,
}

impl ProviderDescriptor {
    /// A descriptor with empty declarative rules.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url_patterns: Vec::new(),
            conversation_id: IdStrategy::Rule(IdRule::default()),
            title: TitleStrategy::Rule(TitleRule::default()),
            messages: MessageStrategy::Selectors(Vec::new()),
            message_filter: None,
            role: RoleRules::default(),
            content: ContentStrategy::Selectors(Vec::new()),
            timestamp: None,
            fill_selectors: Vec::new(),
        }
    }

    pub fn with_url_patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.url_patterns = patterns.into_iter().map(|p| p.into()).collect();
        self
    }

    pub fn with_conversation_id(mut self, strategy: IdStrategy) -> Self {
        self.conversation_id = strategy;
        self
    }

    pub fn with_title(mut self, strategy: TitleStrategy) -> Self {
        self.title = strategy;
        self
    }

    pub fn with_message_selectors(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.messages = MessageStrategy::Selectors(selectors.into_iter().map(|s| s.into()).collect());
        self
    }

    pub fn with_messages(mut self, strategy: MessageStrategy) -> Self {
        self.messages = strategy;
        self
    }

    pub fn with_message_filter(mut self, filter: Custom<dyn MessageFilter>) -> Self {
        self.message_filter = Some(filter);
        self
    }

    pub fn with_role(mut self, role: RoleRules) -> Self {
        self.role = role;
        self
    }

    pub fn with_content_selectors(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.content = ContentStrategy::Selectors(selectors.into_iter().map(|s| s.into()).collect());
        self
    }

    pub fn with_content(mut self, strategy: ContentStrategy) -> Self {
        self.content = strategy;
        self
    }

    pub fn with_timestamp(mut self, rule: TimestampRule) -> Self {
        self.timestamp = Some(rule);
        self
    }

    pub fn with_fill_selectors(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fill_selectors = selectors.into_iter().map(|s| s.into()).collect();
        self
    }
}

/// Conversation id resolution.
#[derive(Debug, Clone)]
pub enum IdStrategy {
    Rule(IdRule),
    /// Result used verbatim; no further fallback
    Custom(Custom<dyn IdResolver>),
}

/// Declarative id resolution: URL capture first, then a page element.
#[derive(Debug, Clone, Default)]
pub struct IdRule {
    /// Regex whose first capture group is the id
    pub pattern: Option<String>,

    /// Element holding the id
    pub selector: Option<String>,

    /// Attribute of `selector` to read instead of its text
    pub attribute: Option<String>,
}

impl IdRule {
    pub fn from_url(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// Title resolution.
#[derive(Debug, Clone)]
pub enum TitleStrategy {
    Rule(TitleRule),
    Custom(Custom<dyn TitleResolver>),
}

/// Declarative title resolution.
#[derive(Debug, Clone, Default)]
pub struct TitleRule {
    /// Tried in order; empty means `["title"]`
    pub selectors: Vec<String>,

    /// Attribute to read instead of text
    pub attribute: Option<String>,

    /// Used when neither selectors nor the document title yield text
    pub fallback: Option<String>,

    /// Literal prefixes stripped from the start, in order
    pub strip_prefixes: Vec<String>,

    /// Literal suffixes stripped from the end, in order
    pub strip_suffixes: Vec<String>,
}

impl TitleRule {
    pub fn from_selectors(selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            selectors: selectors.into_iter().map(|s| s.into()).collect(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefixes.push(prefix.into());
        self
    }

    pub fn strip_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.strip_suffixes.push(suffix.into());
        self
    }
}

/// Message element discovery.
#[derive(Debug, Clone)]
pub enum MessageStrategy {
    /// Union of matches, deduplicated by element identity, first-seen order
    Selectors(Vec<String>),
    Custom(Custom<dyn MessageFinder>),
}

/// Role detection chain. Stages run in order; the first hit wins.
#[derive(Debug, Clone, Default)]
pub struct RoleRules {
    /// Attribute whose value is looked up in `values`
    pub attribute: Option<String>,

    /// Attribute value (case-insensitive) to role
    pub values: IndexMap<String, Role>,

    /// Class-name keyword to role; `=word` matches a whole class word only
    pub class_hints: IndexMap<String, Role>,

    /// Custom last stage
    pub fallback: Option<Custom<dyn RoleDetector>>,
}

impl RoleRules {
    pub fn from_attribute(attribute: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>, role: Role) -> Self {
        self.values.insert(value.into(), role);
        self
    }

    pub fn with_class_hint(mut self, keyword: impl Into<String>, role: Role) -> Self {
        self.class_hints.insert(keyword.into(), role);
        self
    }

    pub fn with_fallback(mut self, fallback: Custom<dyn RoleDetector>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

/// Message content extraction.
#[derive(Debug, Clone)]
pub enum ContentStrategy {
    /// Scoped to the message element; first non-blank wins, else the element's own text
    Selectors(Vec<String>),
    Custom(Custom<dyn ContentExtractor>),
}

/// Where a message timestamp lives.
#[derive(Debug, Clone, Default)]
pub struct TimestampRule {
    /// Child of the message element; the element itself when absent
    pub selector: Option<String>,

    /// Attribute to read; defaults to `datetime`, then falls back to text
    pub attribute: Option<String>,

    pub parser: Option<Custom<dyn TimestampParser>>,
}

impl TimestampRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_parser(mut self, parser: Custom<dyn TimestampParser>) -> Self {
        self.parser = Some(parser);
        self
    }
}
