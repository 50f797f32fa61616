// src/signals/text.rs
//! Text helpers shared by the providers: snippet normalization and query keywords.

use once_cell::sync::OnceCell;
use regex::Regex;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "are", "was", "were", "will", "have", "has",
    "had", "been", "from", "they", "their", "them", "there", "here", "when", "where", "what",
    "which", "who", "why", "how", "about", "into", "through", "using", "our", "your", "you",
    "can", "like", "also", "its", "not", "but", "all", "any", "more", "most",
];

/// Normalize third-party text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Cut to `max` chars, appending "..." when something was dropped.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Meaningful lower-cased words of an idea, in order, without duplicates.
pub fn keywords(idea: &str, max: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in idea.split_whitespace() {
        let word = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() <= 2 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        if !out.contains(&word) {
            out.push(word);
        }
        if out.len() == max {
            break;
        }
    }
    out
}
