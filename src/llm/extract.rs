//! SQL extraction from raw model output.
//!
//! Models wrap statements in markdown fences and pad them with prose. The
//! cleaner is an explicit ordered list of normalization rules, each a
//! standalone function, so rule interaction stays auditable:
//!
//! 1. [`strip_code_fences`] — remove ``` markers (with or without a language
//!    tag), keeping the fenced content.
//! 2. [`trim_commentary`] — drop leading lines until the first SQL verb and
//!    trailing lines past the statement.
//! 3. [`collapse_whitespace`] — fold whitespace runs into single spaces.
//! 4. [`first_statement`] — when several `;`-separated statements remain,
//!    keep only the first (semicolon retained). Policy choice: source
//!    behavior for multi-statement output is undefined, so we truncate
//!    rather than guess.
//!
//! Re-applying the rules to an already-clean statement is a no-op.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{PipelineError, Result};

/// SQL verbs accepted as the start of a statement.
const SQL_STARTERS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "PRAGMA", "EXPLAIN",
];

/// The cleaning rules in application order.
pub const RULES: &[(&str, fn(&str) -> String)] = &[
    ("strip_code_fences", strip_code_fences),
    ("trim_commentary", trim_commentary),
    ("collapse_whitespace", collapse_whitespace),
    ("first_statement", first_statement),
];

/// Apply all cleaning rules in order and validate the remainder.
///
/// # Errors
///
/// Returns [`PipelineError::NoSqlFound`] when no plausible statement remains
/// (model refusal, pure prose).
pub fn extract(raw: &str) -> Result<String> {
    let mut text = raw.to_string();
    for (name, rule) in RULES {
        text = rule(&text);
        tracing::trace!(rule = name, "applied cleaning rule");
    }

    if !starts_with_sql(&text) {
        return Err(PipelineError::NoSqlFound(snippet(raw)));
    }
    Ok(text)
}

/// Remove markdown fence markers, with or without a language tag.
pub fn strip_code_fences(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9]*").expect("valid fence regex"));
    fence.replace_all(text, "").into_owned()
}

/// Drop commentary lines around the statement.
///
/// Keeps lines starting at the first SQL verb; stops after the line carrying
/// the statement terminator or at the first blank line. Returns an empty
/// string when no SQL verb is found.
pub fn trim_commentary(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut in_statement = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if !in_statement {
            if starts_with_sql(trimmed) {
                in_statement = true;
            } else {
                continue;
            }
        } else if trimmed.is_empty() {
            break;
        }
        kept.push(trimmed);
        if trimmed.contains(';') {
            break;
        }
    }

    kept.join("\n")
}

/// Fold whitespace and newline runs into single spaces, trimming the ends.
pub fn collapse_whitespace(text: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    ws.replace_all(text.trim(), " ").into_owned()
}

/// Truncate to the first `;`-terminated statement, keeping the semicolon.
pub fn first_statement(text: &str) -> String {
    match text.find(';') {
        Some(i) => text[..=i].to_string(),
        None => text.to_string(),
    }
}

/// Whether the text starts with a recognized SQL verb.
fn starts_with_sql(text: &str) -> bool {
    let upper = text.trim_start().to_uppercase();
    SQL_STARTERS.iter().any(|verb| {
        upper.starts_with(verb)
            && upper[verb.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_ascii_alphanumeric())
    })
}

/// Short snippet of the raw response for error messages.
fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() > 120 {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < 120)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", &trimmed[..cut])
    } else {
        trimmed.to_string()
    }
}
