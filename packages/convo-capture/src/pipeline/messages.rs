//! Message discovery, content extraction and timestamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::ElementRef;
use std::collections::HashSet;
use tracing::debug;

use crate::dom::{attribute_of, query_first_within, text_of, Page};
use crate::types::descriptor::{ContentStrategy, MessageStrategy, TimestampRule};

const DEFAULT_TIMESTAMP_ATTRIBUTE: &str = "datetime";

/// Collect the message elements of `page`.
///
/// Selector matches are unioned in selector order, keeping the first
/// occurrence of each element.
pub fn collect_message_elements<'a>(strategy: &MessageStrategy, page: &'a Page) -> Vec<ElementRef<'a>> {
    match strategy {
        MessageStrategy::Custom(finder) => {
            let found = finder.find(page);
            debug!(finder = finder.name(), count = found.len(), "Custom message finder");
            found
        }
        MessageStrategy::Selectors(selectors) => {
            let mut seen = HashSet::new();
            let mut elements = Vec::new();
            for selector in selectors {
                for element in page.query(selector) {
                    if seen.insert(element.id()) {
                        elements.push(element);
                    }
                }
            }
            debug!(selectors = selectors.len(), count = elements.len(), "Collected message elements");
            elements
        }
    }
}

/// Extract the trimmed text content of one message element.
///
/// Empty means the message carries nothing and should be dropped.
pub fn extract_content(element: &ElementRef<'_>, strategy: &ContentStrategy) -> String {
    match strategy {
        ContentStrategy::Custom(extractor) => extractor.extract(element).trim().to_string(),
        ContentStrategy::Selectors(selectors) => selectors
            .iter()
            .filter_map(|selector| query_first_within(element, selector))
            .map(|matched| text_of(&matched))
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| text_of(element)),
    }
}

/// Read and parse the timestamp of one message element.
///
/// Returns `None` when the target is missing, blank or unparseable.
pub fn extract_timestamp(element: &ElementRef<'_>, rule: &TimestampRule) -> Option<DateTime<Utc>> {
    let target = match rule.selector.as_deref() {
        Some(selector) => query_first_within(element, selector)?,
        None => *element,
    };

    let attribute = rule.attribute.as_deref().unwrap_or(DEFAULT_TIMESTAMP_ATTRIBUTE);
    let raw = attribute_of(&target, attribute)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| text_of(&target));
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    match &rule.parser {
        Some(parser) => parser.parse(value),
        None => parse_timestamp(value),
    }
}

/// Best-effort parsing of the date formats chat pages commonly render.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}
