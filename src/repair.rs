//! Cleanup and repair of JSON produced by a generative model.
//!
//! Models often wrap their answer in markdown fences or leave small syntax
//! slips behind. This module strips the fences and retries parsing with a
//! short list of textual fixes before giving up.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::RepairError;

/// Characters of context shown on each side of a parse error.
const EXCERPT_RADIUS: usize = 50;

fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma pattern"))
}

/// Strip surrounding whitespace and markdown code fences.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Clean model output and parse it as JSON, repairing common slips.
///
/// Fixes are tried in order on the fenced-stripped text; the first one that
/// parses wins:
/// 1. trailing commas before `}` or `]` removed
/// 2. escaped quotes (`\"`) unescaped
/// 3. everything outside the outermost `{ ... }` dropped
///
/// # Errors
///
/// Returns `RepairError::Empty` for blank output, or
/// `RepairError::Unparseable` describing the original parse failure.
pub fn clean_and_parse(raw: &str) -> Result<Value, RepairError> {
    let text = strip_fences(raw);
    if text.is_empty() {
        return Err(RepairError::Empty);
    }

    let original = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let fixes: [fn(&str) -> Option<String>; 3] = [
        |t| Some(trailing_comma().replace_all(t, "$1").into_owned()),
        |t| Some(t.replace("\\\"", "\"")),
        outermost_object,
    ];

    for fix in fixes {
        if let Some(candidate) = fix(text) {
            if let Ok(value) = serde_json::from_str(&candidate) {
                return Ok(value);
            }
        }
    }

    Err(RepairError::Unparseable {
        message: original.to_string(),
        line: original.line(),
        column: original.column(),
        excerpt: excerpt(text, original.line(), original.column()),
    })
}

fn outermost_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| text[start..=end].to_string())
}

/// Text around a 1-based line/column position.
fn excerpt(text: &str, line: usize, column: usize) -> String {
    let Some(line_text) = text.lines().nth(line.saturating_sub(1)) else {
        return String::new();
    };
    let start = column.saturating_sub(EXCERPT_RADIUS + 1);
    line_text
        .chars()
        .skip(start)
        .take(EXCERPT_RADIUS * 2)
        .collect()
}
