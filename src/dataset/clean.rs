//! Free-text cleanup for the narrative columns of the case export.

use std::sync::LazyLock;

use regex::Regex;

/// Line breaks as they appear in the export: `<br>`, `<br/>`, `<br />` and the
/// truncated `<br<`, in any case.
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|<br<").expect("line-break pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Replace HTML line breaks with a space, collapse whitespace runs and trim.
/// `None` passes through untouched.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    value.map(clean_str)
}

pub fn clean_str(value: &str) -> String {
    // Removing one marker can splice two fragments into a new one
    // (`<br <br>>` becomes `<br  >`), so replace until nothing matches.
    let mut text = value.to_string();
    while LINE_BREAK.is_match(&text) {
        text = LINE_BREAK.replace_all(&text, " ").into_owned();
    }
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// True when `value` still carries a line-break marker.
pub fn has_line_break(value: &str) -> bool {
    LINE_BREAK.is_match(value)
}
