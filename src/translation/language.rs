//! Script-based language guess.
//!
//! Only good enough to tell "already in the target language" for common
//! cases. Latin-only text is presumed English.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\p{Cyrillic}", "ru"),
        (r"\p{Greek}", "el"),
        (r"\p{Arabic}", "ar"),
        (r"\p{Hebrew}", "he"),
        // kana before Han so Japanese with kanji is not reported as Chinese
        (r"[\p{Hiragana}\p{Katakana}]", "ja"),
        (r"\p{Hangul}", "ko"),
        (r"\p{Han}", "zh"),
        (r"\p{Thai}", "th"),
        (r"\p{Devanagari}", "hi"),
    ]
    .into_iter()
    .filter_map(|(pattern, lang)| Regex::new(pattern).ok().map(|re| (re, lang)))
    .collect()
});

/// Guess the language of `text` from the scripts it uses.
/// Returns `None` when there are no letters at all.
pub fn detect_language(text: &str) -> Option<&'static str> {
    if let Some((_, lang)) = SCRIPTS.iter().find(|(re, _)| re.is_match(text)) {
        return Some(*lang);
    }

    if text.chars().any(char::is_alphabetic) {
        Some("en")
    } else {
        None
    }
}

/// Primary subtag, lowercased: "en-US" -> "en".
pub fn normalize_language(lang: &str) -> String {
    lang.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

pub fn same_language(a: &str, b: &str) -> bool {
    normalize_language(a) == normalize_language(b)
}
