//! Input filling and prompt template composition.

use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::dom::{attribute_of, Page};
use crate::error::FillError;
use crate::traits::input::{InputEvent, InputEventKind, InputHandle, InputKind, InputSurface};
use crate::types::descriptor::ProviderDescriptor;

/// A named placeholder in a prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVariable {
    #[serde(alias = "key")]
    pub name: String,

    #[serde(default, alias = "default_value", skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl TemplateVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Variables as a prompt library stores them: bare names or objects.
///
/// Entries that are neither, or that lack a name, are skipped.
pub fn template_variables_from(raw: &[Value]) -> Vec<TemplateVariable> {
    raw.iter()
        .filter_map(|value| match value {
            Value::String(name) => Some(TemplateVariable::new(name.trim())),
            Value::Object(_) => serde_json::from_value::<TemplateVariable>(value.clone())
                .map_err(|e| warn!(error = %e, "Skipping malformed template variable"))
                .ok(),
            _ => None,
        })
        .filter(|variable| !variable.name.is_empty())
        .collect()
}

/// Replace `{{ name }}` placeholders for each declared variable.
///
/// A supplied value wins, then the variable's default, then the empty
/// string. Placeholders for undeclared names are left as they are.
pub fn render_template(content: &str, variables: &[TemplateVariable], values: &HashMap<String, String>) -> String {
    let mut rendered = content.to_string();
    for variable in variables.iter().filter(|v| !v.name.is_empty()) {
        let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(&variable.name));
        let Ok(re) = Regex::new(&pattern) else {
            warn!(variable = %variable.name, "Skipping unrenderable template variable");
            continue;
        };
        let value = values
            .get(&variable.name)
            .map(String::as_str)
            .or(variable.default.as_deref())
            .unwrap_or_default();
        rendered = re.replace_all(&rendered, regex::NoExpand(value)).into_owned();
    }
    rendered
}

/// Write `content` into the first visible, enabled control matching
/// `selectors`.
pub fn fill_input<S: InputSurface + ?Sized>(
    surface: &mut S,
    content: &str,
    selectors: &[String],
) -> Result<InputHandle, FillError> {
    let handle = surface.locate(selectors).ok_or(FillError::NoInput)?;
    surface.write(&handle, content)?;
    debug!(selector = %handle.selector, kind = ?handle.kind, chars = content.chars().count(), "Filled input");
    Ok(handle)
}

/// [`fill_input`] with the descriptor's own locators.
pub fn fill_for_descriptor<S: InputSurface + ?Sized>(
    surface: &mut S,
    descriptor: &ProviderDescriptor,
    content: &str,
) -> Result<InputHandle, FillError> {
    fill_input(surface, content, &descriptor.fill_selectors)
}

fn input_kind(element: &ElementRef<'_>) -> InputKind {
    if matches!(
        attribute_of(element, "contenteditable").as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("" | "true" | "plaintext-only")
    ) {
        return InputKind::ContentEditable;
    }
    match element.value().name() {
        "textarea" => InputKind::TextArea,
        "input" => InputKind::TextInput,
        _ => InputKind::Other,
    }
}

fn hides_itself(element: &ElementRef<'_>) -> bool {
    if element.value().attr("hidden").is_some() {
        return true;
    }
    if element.value().name() == "input"
        && attribute_of(element, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    let style: String = attribute_of(element, "style")
        .unwrap_or_default()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    style.contains("display:none") || style.contains("visibility:hidden")
}

/// Not hidden by itself or any ancestor.
fn is_visible(element: &ElementRef<'_>) -> bool {
    !hides_itself(element)
        && !element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| hides_itself(&ancestor))
}

fn is_enabled(element: &ElementRef<'_>) -> bool {
    let el = element.value();
    el.attr("disabled").is_none() && el.attr("readonly").is_none() && el.attr("aria-disabled") != Some("true")
}

impl InputSurface for Page {
    fn locate(&self, selectors: &[String]) -> Option<InputHandle> {
        selectors.iter().find_map(|selector| {
            let element = self
                .query(selector)
                .into_iter()
                .find(|el| is_visible(el) && is_enabled(el))?;
            Some(InputHandle {
                ordinal: self.ordinal_of(&element)?,
                selector: selector.clone(),
                kind: input_kind(&element),
            })
        })
    }

    fn write(&mut self, handle: &InputHandle, content: &str) -> Result<(), FillError> {
        if self.element_at(handle.ordinal).is_none() {
            return Err(FillError::StaleHandle);
        }
        self.filled.insert(handle.ordinal, content.to_string());
        self.events.extend(InputEventKind::SEQUENCE.iter().map(|kind| InputEvent {
            kind: *kind,
            ordinal: handle.ordinal,
            data: content.to_string(),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_template() {
        let variables = vec![
            TemplateVariable::new("topic"),
            TemplateVariable::new("tone").with_default("friendly"),
            TemplateVariable::new("audience"),
        ];
        let values = HashMap::from([("topic".to_string(), "Rust $1 traits".to_string())]);
        let rendered = render_template(
            "Explain {{topic}} in a {{ tone }} way to {{audience}}. Keep {{ other }}.",
            &variables,
            &values,
        );
        assert_eq!(rendered, "Explain Rust $1 traits in a friendly way to . Keep {{ other }}.");
    }

    #[test]
    fn test_template_variables_from_library_shapes() {
        let raw = vec![
            serde_json::json!("topic"),
            serde_json::json!({"name": "tone", "default": "brief"}),
            serde_json::json!({"key": "lang", "default_value": "Rust"}),
            serde_json::json!({"default": "orphan"}),
            serde_json::json!(3),
        ];
        let variables = template_variables_from(&raw);
        assert_eq!(
            variables,
            vec![
                TemplateVariable::new("topic"),
                TemplateVariable::new("tone").with_default("brief"),
                TemplateVariable::new("lang").with_default("Rust"),
            ]
        );

        let values = HashMap::from([("topic".to_string(), "ownership".to_string())]);
        assert_eq!(
            render_template("{{topic}} in {{ lang }}, {{tone}}", &variables, &values),
            "ownership in Rust, brief"
        );
    }

    #[test]
    fn test_template_variable_aliases() {
        let variable: TemplateVariable =
            serde_json::from_value(serde_json::json!({"key": "lang", "default_value": "en"})).unwrap();
        assert_eq!(variable, TemplateVariable::new("lang").with_default("en"));
    }

    #[test]
    fn test_locate_skips_hidden_and_disabled() {
        let page = Page::parse(
            "https://x",
            r#"<textarea id="a" hidden></textarea>
               <div style="display: none"><textarea id="b"></textarea></div>
               <textarea id="c" disabled></textarea>
               <textarea id="d">old</textarea>
               <div id="e" contenteditable="true"></div>"#,
        );
        let handle = page.locate(&selectors(&["textarea", "[contenteditable]"])).unwrap();
        assert_eq!(handle.selector, "textarea");
        assert_eq!(handle.kind, InputKind::TextArea);
        let located = page.element_at(handle.ordinal).unwrap();
        assert_eq!(located.value().attr("id"), Some("d"));

        let editable = page.locate(&selectors(&["#missing", "[contenteditable]"])).unwrap();
        assert_eq!(editable.kind, InputKind::ContentEditable);
        assert!(page.locate(&selectors(&["#a", "#b", "#c"])).is_none());
    }

    #[test]
    fn test_fill_writes_overlay_and_events() {
        let mut page = Page::parse("https://x", r#"<input id="q" type="text" value="draft">"#);
        let handle = fill_input(&mut page, "hello", &selectors(&["#q"])).unwrap();
        assert_eq!(handle.kind, InputKind::TextInput);

        let input = page.query_first("#q").unwrap();
        assert_eq!(page.value_of(&input), "hello");

        let kinds: Vec<_> = page.input_events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, InputEventKind::SEQUENCE.to_vec());
        assert!(page.input_events().iter().all(|e| e.data == "hello"));
    }

    #[test]
    fn test_fill_errors() {
        let mut page = Page::parse("https://x", "<p>no inputs</p>");
        assert_eq!(fill_input(&mut page, "x", &selectors(&["textarea"])), Err(FillError::NoInput));

        let stale = InputHandle {
            ordinal: 10_000,
            selector: "textarea".into(),
            kind: InputKind::TextArea,
        };
        assert_eq!(page.write(&stale, "x"), Err(FillError::StaleHandle));
    }

    #[test]
    fn test_fill_for_descriptor_uses_fill_selectors() {
        let mut page = Page::parse("https://chatgpt.com/", r#"<textarea id="prompt-textarea"></textarea>"#);
        let descriptor = ProviderDescriptor::new("ChatGPT").with_fill_selectors(["#prompt-textarea", "textarea"]);
        let handle = fill_for_descriptor(&mut page, &descriptor, "Summarize this").unwrap();
        assert_eq!(handle.selector, "#prompt-textarea");
    }
}
