//! Decoding of raw model completions into candidate payloads.
//!
//! Two strategies, matching the prompt variants: strict JSON (with a
//! balanced-brace rescue for JSON wrapped in prose) and a tagged-text format
//! where each field arrives as `<name>...</name>`. The tagged extractor
//! produces a typed intermediate map first, then projects it into a JSON
//! object, so the grammar of the fallback format is explicit rather than
//! scraped ad hoc.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::io::prompt::PromptVariant;

/// The completion held no recognizable payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub detail: String,
}

impl ParseError {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unparseable completion: {}", self.detail)
    }
}

impl std::error::Error for ParseError {}

/// Decode a completion into a candidate JSON object.
pub fn decode_candidate(text: &str, variant: PromptVariant) -> Result<Value, ParseError> {
    match variant {
        PromptVariant::Schema => decode_json(text),
        PromptVariant::Tagged => decode_tagged(text),
    }
}

/// Strict JSON parse, falling back to the first balanced `{...}` substring
/// when the model wrapped the object in prose or code fences.
fn decode_json(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let snippet = first_balanced_object(trimmed)
        .ok_or_else(|| ParseError::new("no JSON object found in completion"))?;
    debug!(snippet_bytes = snippet.len(), "recovered JSON object from prose");
    match serde_json::from_str::<Value>(snippet) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ParseError::new("balanced snippet is not a JSON object")),
        Err(err) => Err(ParseError::new(format!("balanced snippet: {err}"))),
    }
}

/// Find the first balanced `{...}` substring, aware of strings and escapes.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Typed intermediate form of a tagged-text completion: field name to the
/// raw text between its tag pair.
type TagMap = BTreeMap<String, String>;

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_]*)>").unwrap());

/// Scan for `<name>...</name>` pairs. The first occurrence of each field
/// wins; unmatched open tags are skipped.
fn extract_tags(text: &str) -> TagMap {
    let mut map = TagMap::new();
    let mut cursor = 0usize;

    while let Some(open) = OPEN_TAG_RE.captures(&text[cursor..]) {
        let whole = open.get(0).expect("capture 0 always present");
        let name = open.get(1).expect("capture 1 in pattern").as_str();
        let body_start = cursor + whole.end();

        let close_tag = format!("</{name}>");
        match text[body_start..].find(&close_tag) {
            Some(rel_close) => {
                let body = &text[body_start..body_start + rel_close];
                map.entry(name.to_string())
                    .or_insert_with(|| body.trim().to_string());
                cursor = body_start + rel_close + close_tag.len();
            }
            None => {
                // No closing pair; resume after the open tag.
                cursor = body_start;
            }
        }
    }

    map
}

const NUMERIC_TAGS: [&str; 11] = [
    "monthlyRevenue",
    "simplesTotal",
    "reformTotal",
    "savings",
    "annualSavings",
    "ibsAmount",
    "cbsAmount",
    "creditsTaken",
    "effectiveRateSimples",
    "effectiveRateReform",
    "healthScore",
];

const TEXT_TAGS: [&str; 3] = ["recommendation", "analysis", "technicalDetails"];

const LIST_TAGS: [&str; 3] = ["decisionDrivers", "legalOptimizations", "strategicRoadmap"];

/// Project a tag map into the candidate object shape shared with the strict
/// JSON path. Fields that fail their typed projection are dropped; the
/// validator rejects the candidate if a required field went missing.
fn decode_tagged(text: &str) -> Result<Value, ParseError> {
    let tags = extract_tags(text);
    if tags.is_empty() {
        return Err(ParseError::new("no field tags found in completion"));
    }

    let mut object = Map::new();

    for field in NUMERIC_TAGS {
        if let Some(raw) = tags.get(field)
            && let Ok(parsed) = raw.trim().parse::<f64>()
            && let Some(number) = serde_json::Number::from_f64(parsed)
        {
            object.insert(field.to_string(), Value::Number(number));
        }
    }

    for field in TEXT_TAGS {
        if let Some(raw) = tags.get(field) {
            object.insert(field.to_string(), Value::String(raw.clone()));
        }
    }

    for field in LIST_TAGS {
        if let Some(raw) = tags.get(field)
            && let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(raw.trim())
        {
            object.insert(field.to_string(), value);
        }
    }

    if object.is_empty() {
        return Err(ParseError::new("tags present but no field projected"));
    }

    debug!(fields = object.len(), "projected tagged completion");
    Ok(Value::Object(object))
}
