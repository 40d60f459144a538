//! Text helpers shared by the quality gate and the context store

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::{Result, TutorError};

lazy_static! {
    static ref VOCAB_WORD_REGEX: Regex = Regex::new(r"^[A-Za-z\s\-']{1,32}$").unwrap();
}

pub struct TextUtils;

impl TextUtils {
    /// Trim, then keep at most `max_chars` characters with trailing whitespace removed.
    /// Never splits a multi-byte character.
    pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
        let trimmed = text.trim();
        match trimmed.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => trimmed[..byte_idx].trim_end(),
            None => trimmed,
        }
    }

    /// Validate a vocabulary word: letters, spaces, `-` and `'`, at most 32 characters.
    pub fn sanitize_word(word: &str) -> Result<String> {
        let trimmed = word.trim();
        if !VOCAB_WORD_REGEX.is_match(trimmed) {
            return Err(TutorError::validation(
                "invalid word: use only letters, spaces, '-' or ''' (max 32 characters)",
            ));
        }
        Ok(trimmed.to_string())
    }
}
