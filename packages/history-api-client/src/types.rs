use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Response body of `GET /providers`.
///
/// Descriptors are kept as raw JSON so a single malformed entry can be
/// skipped by the consumer without failing the whole response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub providers: Vec<serde_json::Value>,
}

impl ProvidersResponse {
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Which prompt-library collection an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryItemKind {
    Prompt,
    Template,
}

impl LibraryItemKind {
    /// Collection path under the API base.
    pub fn endpoint(self) -> &'static str {
        match self {
            LibraryItemKind::Prompt => "prompts",
            LibraryItemKind::Template => "templates",
        }
    }
}

/// A saved prompt or template as listed by `GET /prompts` and `GET /templates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Set by the client; the backend does not send it
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<LibraryItemKind>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LibraryItem {
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }

    /// Last modification time, falling back to creation time.
    pub fn sort_time(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .or(self.created_at.as_deref())
            .and_then(parse_timestamp)
    }
}

/// A library item with the content and variables of its latest version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: LibraryItem,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub variables: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<LibraryItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VersionsResponse {
    #[serde(default)]
    pub versions: Vec<VersionRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VersionDetail {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub variables: Vec<serde_json::Value>,
}

/// Tag each list with its kind and order newest first.
///
/// Items without a parseable timestamp go last; ties keep prompts before
/// templates and the backend's own order.
pub fn merge_library_items(prompts: Vec<LibraryItem>, templates: Vec<LibraryItem>) -> Vec<LibraryItem> {
    let tag = |kind: LibraryItemKind| {
        move |mut item: LibraryItem| {
            item.kind = Some(kind);
            item
        }
    };
    let mut items: Vec<LibraryItem> = prompts
        .into_iter()
        .map(tag(LibraryItemKind::Prompt))
        .chain(templates.into_iter().map(tag(LibraryItemKind::Template)))
        .collect();
    items.sort_by(|a, b| b.sort_time().cmp(&a.sort_time()));
    items
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}
