//! Text folding for address matching
//!
//! Addresses arrive in mixed French/Arabic transliteration with inconsistent
//! accents, apostrophes and casing ("L'Ariana", "BÉJA", "Cité  Ennasr 2").
//! Every pattern and every address goes through [`normalize_text`] so that
//! plain substring checks behave.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text for matching.
///
/// - Unicode NFKD, combining marks dropped (`é` -> `e`)
/// - Lowercase
/// - Anything not alphanumeric becomes a space
/// - Whitespace collapsed and trimmed
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold an identifier-like tag (layer, category, network flag).
/// Keeps underscores and inner punctuation; only case and surrounding
/// whitespace are folded.
pub fn normalize_tag(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Normalize an optional field, mapping blank input to `None`
pub fn normalize_optional(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|n| !n.is_empty())
}
