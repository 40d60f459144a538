//! Line-level handling of two-language text blocks.
//!
//! A line containing any CJK unified ideograph (U+4E00..=U+9FFF) is Chinese,
//! every other non-empty line is English. This is a heuristic: a mixed-script
//! line is classified as Chinese.

use lazy_static::lazy_static;
use regex::Regex;

use crate::exercise::LearningDirection;

lazy_static! {
    static ref LANGUAGE_LABEL: Regex = Regex::new(r"^(?i:english|chinese)[:：]").unwrap();
}

/// Remove a leading `English:` / `Chinese:` label (ASCII or full-width colon)
/// from every line. Lines are trimmed.
pub fn strip_language_labels(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            match LANGUAGE_LABEL.find(trimmed) {
                Some(label) => trimmed[label.end()..].trim(),
                None => trimmed,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn contains_cjk(line: &str) -> bool {
    line.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// English and Chinese slots of a block; an empty string marks a missing slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BilingualPair {
    pub english: String,
    pub chinese: String,
}

impl BilingualPair {
    pub fn new(english: impl Into<String>, chinese: impl Into<String>) -> Self {
        Self {
            english: english.into().trim().to_string(),
            chinese: chinese.into().trim().to_string(),
        }
    }

    /// First English line and first Chinese line of `text`; later lines are ignored.
    pub fn split(text: &str) -> Self {
        let mut pair = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if contains_cjk(line) {
                if pair.chinese.is_empty() {
                    pair.chinese = line.to_string();
                }
            } else if pair.english.is_empty() {
                pair.english = line.to_string();
            }
        }
        pair
    }

    pub fn is_empty(&self) -> bool {
        self.english.is_empty() && self.chinese.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.english.is_empty() && !self.chinese.is_empty()
    }

    /// Copy the known language into a missing slot.
    pub fn duplicate_missing(&mut self) {
        if self.english.is_empty() {
            self.english = self.chinese.clone();
        } else if self.chinese.is_empty() {
            self.chinese = self.english.clone();
        }
    }

    /// Two lines ordered by direction: Chinese first for `zh_to_en`, English
    /// first otherwise. A missing slot repeats the known one; an empty pair
    /// composes to an empty string.
    pub fn compose(&self, direction: Option<LearningDirection>) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut pair = self.clone();
        pair.duplicate_missing();
        match direction {
            Some(LearningDirection::ZhToEn) => format!("{}\n{}", pair.chinese, pair.english),
            _ => format!("{}\n{}", pair.english, pair.chinese),
        }
    }
}

/// Fill missing slots of `text` from `fallback_text`, duplicate any slot that is
/// still missing, and compose by direction. Text with neither language is
/// returned label-stripped.
pub fn ensure_bilingual_text(text: &str, fallback_text: &str, direction: Option<LearningDirection>) -> String {
    let cleaned = strip_language_labels(text);
    let mut pair = BilingualPair::split(&cleaned);
    let fallback = BilingualPair::split(&strip_language_labels(fallback_text));
    if pair.english.is_empty() {
        pair.english = fallback.english;
    }
    if pair.chinese.is_empty() {
        pair.chinese = fallback.chinese;
    }
    if pair.is_empty() {
        return cleaned;
    }
    pair.compose(direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stripped_per_line() {
        let text = "English: A small pet.\nchinese：一种小宠物。\n  Notes: keep";
        assert_eq!(strip_language_labels(text), "A small pet.\n一种小宠物。\nNotes: keep");
        assert_eq!(strip_language_labels("ENGLISH:cat"), "cat");
        assert_eq!(strip_language_labels("Englishman: hi"), "Englishman: hi");
    }

    #[test]
    fn split_takes_first_line_of_each_language() {
        let pair = BilingualPair::split("\nA cat.\n一只猫。\nAnother line.\n第二行。");
        assert_eq!(pair, BilingualPair::new("A cat.", "一只猫。"));

        let only_english = BilingualPair::split("A cat.");
        assert_eq!(only_english.chinese, "");
        assert!(!only_english.is_complete());
    }

    #[test]
    fn mixed_script_line_counts_as_chinese() {
        let pair = BilingualPair::split("cat 猫");
        assert_eq!(pair.english, "");
        assert_eq!(pair.chinese, "cat 猫");
    }

    #[test]
    fn compose_orders_by_direction() {
        let pair = BilingualPair::new("A cat.", "一只猫。");
        assert_eq!(pair.compose(Some(LearningDirection::EnToZh)), "A cat.\n一只猫。");
        assert_eq!(pair.compose(Some(LearningDirection::ZhToEn)), "一只猫。\nA cat.");
        assert_eq!(pair.compose(None), "A cat.\n一只猫。");
    }

    #[test]
    fn compose_never_leaves_a_blank_line() {
        let pair = BilingualPair::new("", "一只猫。");
        assert_eq!(pair.compose(None), "一只猫。\n一只猫。");
        assert_eq!(BilingualPair::default().compose(None), "");
    }

    #[test]
    fn ensure_bilingual_fills_from_fallback() {
        let text = ensure_bilingual_text("English: A cat.", "小猫。", Some(LearningDirection::ZhToEn));
        assert_eq!(text, "小猫。\nA cat.");

        let duplicated = ensure_bilingual_text("A cat.", "", None);
        assert_eq!(duplicated, "A cat.\nA cat.");

        assert_eq!(ensure_bilingual_text("  ", "", None), "");
    }
}
