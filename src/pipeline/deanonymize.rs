//! Restores tokenized free text in generated output.

use std::sync::LazyLock;

use regex::Regex;

use super::anonymize::{AnonymizedPrompt, PATIENT_PLACEHOLDER};

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([,.;:!?])").expect("valid regex"));

/// Drop the patient placeholder, tidy whitespace, then replace every
/// occurrence of every token with its original text.
///
/// Originals are inserted after tidying and are never rewritten. Longer
/// tokens are replaced first so a token that prefixes another cannot
/// corrupt it.
pub fn deanonymize(text: &str, prompt: &AnonymizedPrompt) -> String {
    let mut restored = tidy(&text.replace(PATIENT_PLACEHOLDER, ""));

    let mut tokens: Vec<(&String, &String)> = prompt.token_map().iter().collect();
    tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
    for (token, original) in tokens {
        restored = restored.replace(token.as_str(), original);
    }
    restored
}

fn tidy(text: &str) -> String {
    let text = SPACE_RUN.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
