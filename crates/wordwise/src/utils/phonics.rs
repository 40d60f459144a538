//! Grapheme-chunk hints shown next to a vocabulary word

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref JOINER_REGEX: Regex = Regex::new(r"[-']").unwrap();
}

// Checked in order; longer graphemes precede their prefixes.
const GRAPHEMES: &[&str] = &[
    "eigh", "igh", "tion", "sion", "tch", "ch", "sh", "th", "ph", "wh", "ck", "ng", "qu", "ee",
    "oo", "ai", "ay", "ea", "ie", "oa", "ou", "ow", "ar", "er", "ir", "or", "ur", "oi", "oy",
    "au", "aw",
];

/// `"night-light"` becomes `"n-igh-t / l-igh-t"`. Empty input gives an empty hint.
pub fn phonics_hint(word: &str) -> String {
    let lowered = word.to_lowercase();
    let cleaned = JOINER_REGEX.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .map(|token| split_token(token).join("-"))
        .collect::<Vec<_>>()
        .join(" / ")
}

fn split_token(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = token;
    while let Some(first) = rest.chars().next() {
        let len = GRAPHEMES
            .iter()
            .find(|g| rest.starts_with(**g))
            .map(|g| g.len())
            .unwrap_or_else(|| first.len_utf8());
        let (head, tail) = rest.split_at(len);
        parts.push(head);
        rest = tail;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_known_graphemes() {
        assert_eq!(phonics_hint("ship"), "sh-i-p");
        assert_eq!(phonics_hint("night"), "n-igh-t");
        assert_eq!(phonics_hint("eight"), "eigh-t");
        assert_eq!(phonics_hint("station"), "s-t-a-tion");
    }

    #[test]
    fn lowercases_and_splits_compounds() {
        assert_eq!(phonics_hint("Ice-Cream"), "i-c-e / c-r-ea-m");
        assert_eq!(phonics_hint("don't"), "d-o-n / t");
    }

    #[test]
    fn empty_and_blank_words() {
        assert_eq!(phonics_hint(""), "");
        assert_eq!(phonics_hint(" - "), "");
    }
}
