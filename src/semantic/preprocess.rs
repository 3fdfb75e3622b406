//! Slide context preprocessing for embedding generation.
//!
//! Prepares a slide's title and content for embedding:
//! 1. Trim whitespace
//! 2. Cap the content at `MAX_CONTENT_CHARS`
//! 3. Concatenate with `CONTEXT_SEPARATOR`

/// Maximum content length taken into the context (characters, not tokens)
const MAX_CONTENT_CHARS: usize = 200;

/// Separator between title and content
pub const CONTEXT_SEPARATOR: &str = ". ";

/// Build the text that represents a slide for similarity ranking.
pub fn slide_context(title: &str, content: &str) -> String {
    let title = title.trim().trim_end_matches('.');
    let content = truncate_chars(content.trim(), MAX_CONTENT_CHARS);

    if title.is_empty() {
        content.to_string()
    } else if content.is_empty() {
        title.to_string()
    } else {
        format!("{title}{CONTEXT_SEPARATOR}{content}")
    }
}

/// Take at most `max_chars` characters without splitting a UTF-8 sequence.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
