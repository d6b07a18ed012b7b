//! Rendering helpers for human-readable change descriptions.

use std::fmt::Display;

/// Renders the full before/after text of one changed value.
///
/// The output is a `[key]` header followed by every line of the old value
/// prefixed with `- ` and every line of the new value prefixed with `+ `.
/// Lines are split on `\n` only, so stripping the prefixes and re-joining
/// with `\n` reproduces both values exactly (trailing newlines included).
///
/// ```
/// use snapshot_diff::line_diff;
///
/// assert_eq!(line_diff("level", "info", "debug"), "[level]\n- info\n+ debug");
/// ```
pub fn line_diff(key: &str, old: &str, new: &str) -> String {
    let mut out = format!("[{}]", key);
    for line in old.split('\n') {
        out.push_str("\n- ");
        out.push_str(line);
    }
    for line in new.split('\n') {
        out.push_str("\n+ ");
        out.push_str(line);
    }
    out
}

/// Displays an optional value, using `<unset>` for `None`.
pub fn display_opt<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<unset>".to_string())
}

/// Joins items with `, `, or returns `<none>` for an empty list.
pub fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "<none>".to_string()
    } else {
        items.join(", ")
    }
}
