//! Cleanup of raw model output into the shape the game expects
//!
//! Chat output is wrapped as `{"message": text}`. Action output is cut down
//! to the outermost JSON object and peeled of the wrappers models like to
//! add.

use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::Mode;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Remove markdown code fences and trim
///
/// Every ` ```json ` (any case) is dropped first, then every bare ` ``` `.
pub fn strip_markdown_fences(text: &str) -> String {
    remove_ignore_ascii_case(text, JSON_FENCE)
        .replace(FENCE, "")
        .trim()
        .to_string()
}

/// Remove every occurrence of an ASCII, lowercase `needle`, ignoring case
fn remove_ignore_ascii_case(text: &str, needle: &str) -> String {
    // ASCII lowercasing keeps byte offsets, so matches index `text` directly
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (idx, _) in lower.match_indices(needle) {
        out.push_str(&text[last..idx]);
        last = idx + needle.len();
    }
    out.push_str(&text[last..]);
    out
}

/// Slice from the first `{` to the last `}`, if they are in that order
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// `{"schema": {...}, ...}` echoed back by the model becomes its inner object
pub fn unwrap_schema_envelope(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value
        .get("schema")
        .filter(|inner| inner.is_object())
        .map(Value::to_string)
}

/// `{"someKey": {...}}` becomes its only value when that value is an object
pub fn unwrap_single_root(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.values()
        .next()
        .filter(|inner| inner.is_object())
        .map(Value::to_string)
}

/// Turn raw provider text into the response body returned to the game
pub fn normalize_response(raw: &str, mode: Mode) -> String {
    let cleaned = strip_markdown_fences(raw);
    match mode {
        Mode::Chat => serde_json::json!({ "message": cleaned }).to_string(),
        Mode::Action => normalize_action(cleaned),
    }
}

fn normalize_action(cleaned: String) -> String {
    let mut text = match extract_json_object(&cleaned) {
        Some(object) => object.to_string(),
        None => {
            warn!("Action response contains no JSON object, returning it as-is");
            return cleaned;
        }
    };

    if let Some(inner) = unwrap_schema_envelope(&text) {
        debug!("Unwrapped echoed schema envelope");
        text = inner;
    }

    if let Some(inner) = unwrap_single_root(&text) {
        debug!("Unwrapped single root key");
        text = inner;
    }

    if serde_json::from_str::<Value>(&text).is_err() {
        warn!("Action response is not valid JSON after cleanup");
    }

    text
}
