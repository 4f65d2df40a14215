//! The explicit provider registry and active-descriptor resolution.

use regex::RegexBuilder;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::descriptor::ProviderDescriptor;

/// Ordered set of provider descriptors.
///
/// Built once at startup (or after a descriptor refresh) and passed by
/// reference to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    descriptors: Vec<Arc<ProviderDescriptor>>,
}

impl ProviderRegistry {
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
        }
    }

    /// Append a descriptor; earlier entries keep precedence.
    pub fn register(&mut self, descriptor: ProviderDescriptor) {
        self.descriptors.push(Arc::new(descriptor));
    }

    /// The active descriptor for `url`: the first whose patterns match.
    pub fn resolve(&self, url: &str) -> Option<Arc<ProviderDescriptor>> {
        resolve_active_descriptor(url, &self.descriptors).cloned()
    }

    /// Descriptor by provider id (case-insensitive).
    pub fn get(&self, id: &str) -> Option<Arc<ProviderDescriptor>> {
        self.descriptors
            .iter()
            .find(|d| d.id.eq_ignore_ascii_case(id))
            .cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.descriptors.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// First descriptor, in list order, with a pattern matching `url`.
pub fn resolve_active_descriptor<'a, D>(url: &str, descriptors: &'a [D]) -> Option<&'a D>
where
    D: AsRef<ProviderDescriptor>,
{
    let found = descriptors.iter().find(|d| {
        let descriptor: &ProviderDescriptor = (*d).as_ref();
        descriptor
            .url_patterns
            .iter()
            .any(|pattern| url_pattern_matches(pattern, url))
    });
    debug!(url = %url, provider = found.map(|d| d.as_ref().id.as_str()), "Resolved active descriptor");
    found
}

impl AsRef<ProviderDescriptor> for ProviderDescriptor {
    fn as_ref(&self) -> &ProviderDescriptor {
        self
    }
}

/// Match one URL pattern.
///
/// `/body/flags` is a regex literal (flags `i`, `m`, `s` honoured; `g`,
/// `u`, `y` accepted and ignored). Anything else is a case-insensitive
/// substring. A literal that fails to compile degrades to a substring
/// match on the whole pattern.
pub fn url_pattern_matches(pattern: &str, url: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    if let Some((body, flags)) = split_regex_literal(pattern) {
        match compile_literal(body, flags) {
            Some(re) => return re.is_match(url),
            None => warn!(pattern = %pattern, "Invalid URL regex, using substring match"),
        }
    }

    url.to_lowercase().contains(&pattern.to_lowercase())
}

fn split_regex_literal(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let last = rest.rfind('/')?;
    Some((&rest[..last], &rest[last + 1..]))
}

fn compile_literal(body: &str, flags: &str) -> Option<regex::Regex> {
    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'g' | 'u' | 'y' => {}
            _ => return None,
        }
    }
    builder.build().ok()
}
