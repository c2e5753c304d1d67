//! Utility functions shared by the kernel and its handlers.
//!
//! `truncate_string` is reused verbatim from the teacher's
//! `shared/src/utils.rs` (char-boundary safe truncation with an ellipsis).
//! `slugify` and `word_count` are new, grounded directly on spec.md §4.6's
//! description of slug derivation and the CJK/whitespace word-counting
//! rule.

use std::time::{SystemTime, UNIX_EPOCH};

/// Truncate a string to at most `max_len` *characters* (not bytes),
/// appending a visible ellipsis when truncated. Used for the 400-char
/// cap on summaries/errors (spec.md §3) and webhook card fields
/// (spec.md §4.5).
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".chars().take(max_len).collect();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{head}...")
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Derive a URL-safe, lowercase, kebab-case slug from a title
/// (spec.md §4.6: "a URL-safe lowercase kebab-case derivation of the
/// title, length-capped"). Non-alphanumeric runs collapse to a single
/// hyphen; leading/trailing hyphens are trimmed.
pub fn slugify(title: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    let truncated: String = slug.chars().take(max_len).collect();
    let trimmed = truncated.trim_end_matches('-').to_string();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

/// Word count for article metadata (spec.md §4.6): for Chinese text,
/// count code points in the CJK Unified Ideographs block (U+4E00–U+9FFF);
/// for other languages, count whitespace-delimited tokens.
pub fn word_count(text: &str, language: &str) -> usize {
    if language.eq_ignore_ascii_case("zh-CN") {
        text.chars()
            .filter(|c| ('\u{4E00}'..='\u{9FFF}').contains(c))
            .count()
    } else {
        text.split_whitespace().count()
    }
}
