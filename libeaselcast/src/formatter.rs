//! Canonical post-text formatter
//!
//! Every destination receives the same post shape:
//!
//! ```text
//! Painting Title
//!
//! Short description (word-capped)
//!
//! #art #artforsale #subject
//! easelcast.art
//! ```
//!
//! Pure functions over content metadata; no network or filesystem access.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::FormatterConfig;
use crate::types::ContentItem;

static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{1,2}(.+?)\*{1,2}").unwrap());

/// Build the full post text for a content item.
pub fn format_post(item: &ContentItem, config: &FormatterConfig) -> String {
    let title = if item.title.is_empty() {
        "Untitled"
    } else {
        item.title.as_str()
    };

    let description = truncate_description(&item.description, config.max_words);
    let hashtags = hashtag_line(&config.base_tags, &item.subject);

    let mut sections = vec![title.to_string()];
    if !description.is_empty() {
        sections.push(description);
    }
    sections.push(format!("{}\n{}", hashtags, config.website));

    sections.join("\n\n")
}

/// Strip emphasis markup, collapse whitespace, and cap the text at
/// `max_words` words (appending `"..."` when truncated).
pub fn truncate_description(text: &str, max_words: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let plain = EMPHASIS_RE.replace_all(text, "$1");
    let words: Vec<&str> = plain.split_whitespace().collect();

    if words.len() <= max_words {
        words.join(" ")
    } else {
        format!("{}...", words[..max_words].join(" "))
    }
}

/// Derive a hashtag from a subject string.
///
/// "Sea Beasties on Titan" becomes "#seabeastiesontitan". Returns `None`
/// when nothing alphanumeric survives.
pub fn subject_hashtag(subject: &str) -> Option<String> {
    let tag: String = subject
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if tag.is_empty() {
        None
    } else {
        Some(format!("#{}", tag))
    }
}

fn hashtag_line(base_tags: &[String], subject: &str) -> String {
    let mut tags: Vec<String> = base_tags.to_vec();
    if let Some(tag) = subject_hashtag(subject) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.join(" ")
}
