//! Prompt concatenation functions backing the simple prompt nodes.
//!
//! All variants share the same contract: an empty prefix returns the text
//! as-is, an empty text returns the prefix as-is, and when both are present
//! they are joined with the configured separator. Literal `\n` sequences in
//! the separator become real line breaks.

/// Join `prefix` and `text` with `separator`.
pub fn join_prompt(text: &str, prefix: &str, separator: &str) -> String {
    if prefix.is_empty() {
        return text.to_string();
    }
    if text.is_empty() {
        return prefix.to_string();
    }
    let sep = separator.replace("\\n", "\n");
    format!("{}{}{}", prefix, sep, text)
}

/// Treat `text` as a comma-separated tag list and re-join `prefix` plus the
/// tags with `", "`. Empty tags are dropped, surrounding whitespace trimmed.
pub fn join_tag_list(text: &str, prefix: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let prefix = prefix.trim();
    if !prefix.is_empty() {
        parts.push(prefix);
    }
    parts.extend(text.split(',').map(str::trim).filter(|t| !t.is_empty()));
    parts.join(", ")
}
