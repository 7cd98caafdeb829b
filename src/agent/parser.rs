//! Turns the model's structured-choice reply into a [`ToolChoice`].
//!
//! Decoding is strict JSON first. If that fails, a single repair pass quotes
//! bare object keys and replaces typographic quotes, then strict decoding is
//! retried. Anything still undecodable is a hard failure.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::llm::StructuredReply;
use crate::tool::{DispatchError, ToolChoice};

/// A bare identifier in key position: directly after `{` or `,`, followed by `:`.
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("bare key pattern is valid")
});

/// Parses a structured-choice reply.
pub fn parse_tool_choice(reply: &StructuredReply) -> Result<ToolChoice, DispatchError> {
    match reply {
        StructuredReply::Mapping(map) => choice_from_mapping(map.clone(), &reply.raw_text()),
        StructuredReply::Text(text) => parse_text(text),
    }
}

fn parse_text(raw: &str) -> Result<ToolChoice, DispatchError> {
    let decoded = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(first) => {
            debug!(error = %first, "Strict decode failed, attempting repair");
            let repaired = repair(raw);
            serde_json::from_str::<Value>(&repaired).map_err(|e| {
                DispatchError::MalformedToolChoice {
                    raw: raw.to_string(),
                    reason: e.to_string(),
                }
            })?
        }
    };

    match decoded {
        Value::Object(map) => choice_from_mapping(map, raw),
        other => Err(DispatchError::MalformedToolChoice {
            raw: raw.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

/// Applies the bounded repair heuristics.
fn repair(raw: &str) -> String {
    let normalized = raw
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let repaired = quote_bare_keys(&normalized);
    if repaired != raw {
        warn!(repaired = %repaired, "Repaired malformed tool choice");
    }
    repaired
}

/// Quotes bare keys, leaving the contents of string literals untouched.
fn quote_bare_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut outside_start = 0;
    let mut chars = text.char_indices();

    while let Some((start, c)) = chars.next() {
        if c != '"' {
            continue;
        }
        out.push_str(&BARE_KEY.replace_all(&text[outside_start..start], "$1\"$2\":"));

        let mut end = text.len();
        let mut escaped = false;
        for (i, c) in chars.by_ref() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = i + 1;
                    break;
                }
                _ => {}
            }
        }
        out.push_str(&text[start..end]);
        outside_start = end;
    }

    out.push_str(&BARE_KEY.replace_all(&text[outside_start..], "$1\"$2\":"));
    out
}

fn choice_from_mapping(mut map: Map<String, Value>, raw: &str) -> Result<ToolChoice, DispatchError> {
    let malformed = |reason: &str| DispatchError::MalformedToolChoice {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let tool_name = match map.remove("tool") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(malformed("\"tool\" must be a string")),
        None => return Err(malformed("missing \"tool\" field")),
    };

    let args = match map.remove("args") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return Err(malformed("\"args\" must be an object")),
    };

    Ok(ToolChoice::new(tool_name, args))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
