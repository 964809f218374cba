//! Sanitization of model-produced root words
//!
//! Model output is never trusted as-is, even under a strict schema.

use serde_json::Value;
use std::collections::HashSet;

/// Coerce a JSON value to a trimmed string (non-scalar values become empty)
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Keep letters, digits, space, apostrophe and hyphen; collapse whitespace
pub fn sanitize_root(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitize a JSON array into unique (case-insensitive) roots, first-seen order kept
pub fn sanitize_list(values: &[Value], cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for value in values {
        let root = sanitize_root(&coerce_string(value));
        if root.is_empty() {
            continue;
        }
        if !seen.insert(root.to_lowercase()) {
            continue;
        }
        out.push(root);
        if out.len() >= cap {
            break;
        }
    }

    out
}
