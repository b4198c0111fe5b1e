//! Lenient recovery of a JSON object from a model reply.
//!
//! Models are told to answer with bare JSON, but routinely wrap it in a
//! fenced code block or add a sentence before or after it. The normalizer
//! strips the fence, slices from the first `{` to the last `}` and makes a
//! single parse attempt. There is no repair beyond that.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FlowError, Result};

/// Maximum number of characters of the offending text kept in a format error
pub const PREVIEW_CHARS: usize = 200;

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Recover the JSON object embedded in `raw`.
pub fn normalize(raw: &str) -> Result<Value> {
    parse_object(raw).map(|(value, _)| value)
}

/// Normalize `raw` and decode the object into `T`.
///
/// A shape mismatch is reported as a format error as well, so callers only
/// ever see one failure kind for an unusable reply.
pub fn normalize_into<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let (value, candidate) = parse_object(raw)?;
    serde_json::from_value(value).map_err(|e| format_error(candidate, e))
}

/// The parsed object together with the span of `raw` it was parsed from
fn parse_object(raw: &str) -> Result<(Value, &str)> {
    let candidate = extract_object_span(strip_code_fence(raw.trim()));

    let value: Value = serde_json::from_str(candidate).map_err(|e| format_error(candidate, e))?;
    if !value.is_object() {
        return Err(format_error(candidate, "expected a JSON object"));
    }
    Ok((value, candidate))
}

fn strip_code_fence(text: &str) -> &str {
    let mut text = text;
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = strip_language_tag(rest);
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

fn strip_language_tag(text: &str) -> &str {
    match text.get(..JSON_TAG.len()) {
        Some(tag) if tag.eq_ignore_ascii_case(JSON_TAG) => &text[JSON_TAG.len()..],
        _ => text,
    }
}

fn extract_object_span(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

fn format_error(text: &str, detail: impl ToString) -> FlowError {
    FlowError::Format {
        preview: preview(text),
        detail: detail.to_string(),
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, cut on a char boundary.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
