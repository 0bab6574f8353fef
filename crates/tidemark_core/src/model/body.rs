//! Plain-text projection of the opaque rich-text body.
//!
//! # Responsibility
//! - Flatten a structured body payload into searchable plain text.
//!
//! # Invariants
//! - The projection is derived exactly once per body change and persisted;
//!   loads never re-derive it.
//! - Node `text` values surface before nested content so document order is
//!   approximated even for container nodes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Derives the plain-text projection for a body payload.
///
/// Rich-text documents keep leaf text under `text` keys; the walk collects
/// every such string. A bare JSON string body is used directly. Whitespace
/// runs collapse to single spaces.
pub fn derive_body_text(body: &Value) -> String {
    let mut pieces: Vec<&str> = Vec::new();
    collect_text(body, &mut pieces);
    let joined = pieces.join(" ");
    WHITESPACE_RE.replace_all(joined.trim(), " ").into_owned()
}

fn collect_text<'a>(value: &'a Value, pieces: &mut Vec<&'a str>) {
    match value {
        Value::String(text) => pieces.push(text),
        Value::Array(nodes) => {
            for node in nodes {
                collect_text(node, pieces);
            }
        }
        Value::Object(fields) => {
            if let Some(Value::String(text)) = fields.get("text") {
                pieces.push(text);
            }
            for (key, child) in fields {
                if key != "text" {
                    collect_text(child, pieces);
                }
            }
        }
        _ => {}
    }
}
