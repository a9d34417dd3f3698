//! Value extraction from fetched content

use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::ExtractionError;

/// Longest value kept from an HTML element, in characters
const MAX_HTML_VALUE_CHARS: usize = 150;

/// Fetched content after sniffing, carrying the parsed document
///
/// Trackers store a single selector string; whether it is applied as a JSON
/// key path or a CSS selector is decided here per check, from the content
/// itself rather than from tracker configuration.
enum SniffedContent {
    Json(Value),
    Html,
}

fn sniff(trimmed: &str) -> SniffedContent {
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(root) = serde_json::from_str(trimmed) {
            return SniffedContent::Json(root);
        }
        tracing::debug!("Content looked like JSON but failed to parse, treating as HTML");
    }
    SniffedContent::Html
}

/// Extract a single display value from raw fetched content
///
/// Content starting with `{` or `[` that parses as JSON is navigated with
/// `selector` as a dot-separated key path (`dealing.status`); anything else
/// is parsed as HTML and `selector` is applied as a CSS selector. Extraction
/// failures are typed errors, never panics.
pub fn extract(raw: &str, selector: &str) -> Result<String, ExtractionError> {
    let trimmed = raw.trim();
    match sniff(trimmed) {
        SniffedContent::Json(root) => extract_json_path(&root, selector),
        SniffedContent::Html => extract_css(trimmed, selector),
    }
}

/// Walk a dot-separated key path through a JSON document
///
/// Objects are stepped by key, arrays by numeric index. The leaf is
/// stringified for display: strings drop their quotes, scalars keep their
/// literal form, composite leaves stay compact JSON.
fn extract_json_path(root: &Value, path: &str) -> Result<String, ExtractionError> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| ExtractionError::KeyNotFound(path.to_string()))?,
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .ok_or_else(|| ExtractionError::KeyNotFound(path.to_string()))?,
            _ => return Err(ExtractionError::KeyNotFound(path.to_string())),
        };
    }
    Ok(stringify_leaf(current))
}

fn stringify_leaf(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Apply a CSS selector to an HTML document and take the first match's text
fn extract_css(raw: &str, selector: &str) -> Result<String, ExtractionError> {
    let parsed = Selector::parse(selector)
        .map_err(|e| ExtractionError::InvalidSelector(format!("{}: {}", selector, e)))?;

    let document = Html::parse_document(raw);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| ExtractionError::ElementNotFound(selector.to_string()))?;

    let text: String = element.text().collect();
    Ok(truncate_chars(text.trim(), MAX_HTML_VALUE_CHARS))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
