//! Cleanup of raw generated text before de-anonymization.
//!
//! Strips reasoning blocks and stray special tokens some models emit,
//! then enforces the registry word cap.

use std::sync::LazyLock;

use regex::Regex;

use super::GenerationError;

/// Appended when the word cap cuts the text.
pub const TRUNCATION_SUFFIX: &str = "...";

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));
static UNCLOSED_THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*$").expect("valid regex"));
static SPECIAL_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\|[a-z_]+\|>|<unused\d+>|</?s>").expect("valid regex")
});

/// Strip model artifacts from raw output.
pub fn strip_artifacts(raw: &str) -> String {
    let text = THINK_BLOCK_RE.replace_all(raw, "");
    let text = UNCLOSED_THINK_RE.replace_all(&text, "");
    let text = SPECIAL_TOKEN_RE.replace_all(&text, "");
    text.trim().to_string()
}

/// Cut `text` after `max_words` words, keeping line breaks inside the kept part.
pub fn cap_words(text: &str, max_words: usize) -> String {
    let mut seen = 0;
    let mut in_word = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            seen += 1;
            if seen > max_words {
                let kept = text[..idx].trim_end();
                return format!("{kept}{TRUNCATION_SUFFIX}");
            }
        }
    }
    text.to_string()
}

/// Full post-processing. An empty result counts as a malformed response.
pub fn clean_generated_text(raw: &str, max_words: usize) -> Result<String, GenerationError> {
    let stripped = strip_artifacts(raw);
    if stripped.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(cap_words(&stripped, max_words))
}
