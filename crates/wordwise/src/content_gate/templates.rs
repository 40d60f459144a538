//! Denylists of placeholder phrasing that generators fall back to when they
//! have nothing real to say. Matching is a case-insensitive substring test and
//! empty text always counts as templated.

const DEFINITION_PATTERNS: &[&str] = &["is a word to learn", "word to learn", "要学习的词", "学习的词"];

const EXAMPLE_PATTERNS: &[&str] = &["i can use the word", "use the word", "我今天可以使用"];

const QUIZ_CHOICE_PATTERNS: &[&str] = &["the meaning of", "的意思", "word to learn"];

fn matches_any(normalized: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| normalized.contains(pattern))
}

fn normalize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

pub fn looks_template_definition(text: &str) -> bool {
    match normalize(text) {
        Some(normalized) => matches_any(&normalized, DEFINITION_PATTERNS),
        None => true,
    }
}

pub fn looks_template_example(text: &str) -> bool {
    match normalize(text) {
        Some(normalized) => matches_any(&normalized, EXAMPLE_PATTERNS),
        None => true,
    }
}

/// A choice that restates "the meaning of <word>" instead of giving one.
pub fn looks_template_quiz_choice(text: &str, word: &str) -> bool {
    let Some(normalized) = normalize(text) else {
        return true;
    };
    let word = word.trim().to_lowercase();
    if normalized.contains(&word) && normalized.contains("meaning") {
        return true;
    }
    matches_any(&normalized, QUIZ_CHOICE_PATTERNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_patterns() {
        assert!(looks_template_definition("Cat is a word to learn."));
        assert!(looks_template_definition("CAT IS A WORD TO LEARN"));
        assert!(looks_template_definition("“猫”是要学习的词"));
        assert!(looks_template_definition("   "));
        assert!(!looks_template_definition("a small furry pet that purrs"));
    }

    #[test]
    fn example_patterns() {
        assert!(looks_template_example("I can use the word cat today."));
        assert!(looks_template_example("我今天可以使用 cat。"));
        assert!(looks_template_example(""));
        assert!(!looks_template_example("The cat sleeps on my bed."));
    }

    #[test]
    fn quiz_choice_patterns() {
        assert!(looks_template_quiz_choice("The meaning of cat", "cat"));
        assert!(looks_template_quiz_choice("cat 的意思", "cat"));
        assert!(looks_template_quiz_choice("What cat meaning is", "Cat"));
        assert!(looks_template_quiz_choice("", "cat"));
        assert!(!looks_template_quiz_choice("A small pet that purrs", "cat"));
        assert!(!looks_template_quiz_choice("Its meaning is unclear", "dog"));
    }
}
