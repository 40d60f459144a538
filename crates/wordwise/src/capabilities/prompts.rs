//! Prompt text sent to the hosted generator

use crate::capabilities::Language;
use crate::exercise::{ExerciseOptions, LearningDirection, OutputStyle, StoryLevel};

const TUTOR_PERSONA: &str = "You are a vocabulary learning assistant for children aged 5-9.
Only help with vocabulary practice. Keep content child-safe and age-appropriate.
Do not discuss adult, violent, sexual, illegal, or hateful content.";

const EXERCISE_KEYS: &str = "Return output strictly in JSON with keys:
definition, example_sentence, quiz_question, quiz_choices, quiz_answer.";

const AUTHOR_PERSONA: &str = "You are a creative children's book author. \
Generate engaging, educational storybooks with vivid descriptions.";

/// Inputs for one vocabulary exercise request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExercisePrompt {
    pub word: String,
    pub context: Vec<String>,
    pub options: ExerciseOptions,
}

/// Inputs for one comprehension story request.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryPrompt {
    pub theme: Option<String>,
    pub level: StoryLevel,
    pub context: Vec<String>,
    pub options: ExerciseOptions,
}

fn language_rules(options: &ExerciseOptions) -> Option<String> {
    let direction = options.direction?;
    let rules = match (direction, options.style) {
        (LearningDirection::Both, _) | (LearningDirection::EnToZh, OutputStyle::Bilingual) => {
            "Provide both English and Chinese for every field. \
             Use two lines with English first, Chinese second. \
             Do not add language labels."
                .to_string()
        }
        (LearningDirection::ZhToEn, OutputStyle::Bilingual) => {
            "Provide both Chinese and English for every field. \
             Use two lines with Chinese first, English second. \
             Do not add language labels."
                .to_string()
        }
        (LearningDirection::EnToZh, OutputStyle::Immersion) => {
            "Use only Chinese for all text. Do not include English.".to_string()
        }
        (LearningDirection::ZhToEn, OutputStyle::Immersion) => {
            "Use only English for all text. Do not include Chinese.".to_string()
        }
    };
    Some(rules)
}

pub fn exercise_system_prompt(options: &ExerciseOptions) -> String {
    let rules = language_rules(options).unwrap_or_else(|| "Always respond in simple English.".to_string());
    format!("{}\n{}\n{}\n", TUTOR_PERSONA, rules, EXERCISE_KEYS)
}

pub fn story_system_prompt(options: &ExerciseOptions) -> String {
    match language_rules(options) {
        Some(rules) => format!("{} {}", AUTHOR_PERSONA, rules),
        None => AUTHOR_PERSONA.to_string(),
    }
}

fn format_context(context: &[String]) -> String {
    if context.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = context.iter().map(|item| format!("- {}", item)).collect();
    format!(
        "\nReference context (use for consistency only; do not copy verbatim):\n{}\n",
        lines.join("\n")
    )
}

pub fn exercise_task_prompt(prompt: &ExercisePrompt) -> String {
    format!(
        "Target word: \"{word}\"
{context}
Create:
1) definition in dictionary-style bilingual format:
   - line 1: concise English meaning with part of speech when possible
   - line 2: matching Chinese translation
2) 3-6 practical example sentence pairs in `example_sentence`:
   - each example uses two lines (English line, then Chinese line)
   - keep examples child-friendly and natural for daily use
3) one multiple-choice quiz question about meaning/usage
4) 3 choices (A/B/C) and the correct answer letter
",
        word = prompt.word,
        context = format_context(&prompt.context),
    )
}

fn level_profile(level: StoryLevel) -> (&'static str, &'static str, &'static str) {
    match level {
        StoryLevel::Beginner => (
            "100-150",
            "very simple words, short sentences, basic concepts",
            "simple questions testing basic understanding",
        ),
        StoryLevel::Intermediate => (
            "200-250",
            "moderate vocabulary, varied sentence structure, some descriptive language",
            "questions testing comprehension and inference",
        ),
        StoryLevel::Expert => (
            "250-350",
            "advanced vocabulary, complex sentences, rich descriptions",
            "questions requiring analysis and critical thinking",
        ),
    }
}

pub fn story_task_prompt(prompt: &StoryPrompt) -> String {
    let (word_count, complexity, question_complexity) = level_profile(prompt.level);
    let theme = match prompt.theme.as_deref().map(str::trim) {
        Some(theme) if !theme.is_empty() => format!("Focus on theme: {}", theme),
        _ => "Choose an appropriate theme like animals, family, school, adventure, or friendship."
            .to_string(),
    };

    format!(
        r#"Generate a short, engaging children's storybook suitable for ages 5-9, followed by 3 multiple-choice comprehension questions.

Requirements:
- Story should be {word_count} words, {complexity}
- Include vocabulary appropriate for the level
- Questions: {question_complexity}
- Question types in order: literal, vocabulary, inference
- Each question has 3 choices (A, B, C)
- Provide a detailed image description for an illustration of the main scene
{context}
{theme}

Return JSON with:
{{
  "story_title": "Story Title",
  "story_text": "Full story text...",
  "story_blocks": [{{"english": "Sentence.", "chinese": "句子。"}}],
  "key_vocabulary": [{{"word": "word", "meaning_en": "meaning", "meaning_zh": "意思"}}],
  "image_description": "Detailed description for illustration...",
  "questions": [
    {{
      "question": "Question 1?",
      "choices": {{"A": "Option A", "B": "Option B", "C": "Option C"}},
      "answer": "A",
      "question_type": "literal",
      "explanation_en": "Why the answer is right.",
      "explanation_zh": "答案解释。",
      "evidence_block_index": 0
    }}
  ]
}}"#,
        context = format_context(&prompt.context),
    )
}

pub fn translation_prompt(text: &str, target: Language) -> String {
    format!(
        "Translate the following text into {}. Keep it simple for a child aged 5-9. \
         Return only the translation, with no labels or quotes.\n\n{}",
        target.name(),
        text
    )
}

pub fn example_sentence_prompt(word: &str, definition: &str) -> String {
    format!(
        "Write one short, natural English sentence a child aged 5-9 could say, using the word \"{}\" \
         with this meaning: {}. Do not explain the word and do not mention that it is a word to learn. \
         Return only the sentence.",
        word, definition
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(direction: Option<LearningDirection>, style: OutputStyle) -> ExerciseOptions {
        ExerciseOptions { direction, style }
    }

    #[test]
    fn no_direction_uses_simple_english() {
        let prompt = exercise_system_prompt(&ExerciseOptions::default());
        assert!(prompt.contains("simple English"));
        assert!(prompt.contains("quiz_answer"));
    }

    #[test]
    fn bilingual_zh_to_en_puts_chinese_first() {
        let prompt = exercise_system_prompt(&options(Some(LearningDirection::ZhToEn), OutputStyle::Bilingual));
        assert!(prompt.contains("Chinese first, English second"));
    }

    #[test]
    fn immersion_uses_target_language_only() {
        let prompt = story_system_prompt(&options(Some(LearningDirection::EnToZh), OutputStyle::Immersion));
        assert!(prompt.contains("Use only Chinese"));
    }

    #[test]
    fn task_prompt_includes_context_lines() {
        let prompt = exercise_task_prompt(&ExercisePrompt {
            word: "brave".to_string(),
            context: vec!["Word: brave".to_string()],
            options: ExerciseOptions::default(),
        });
        assert!(prompt.contains("Target word: \"brave\""));
        assert!(prompt.contains("- Word: brave"));
    }

    #[test]
    fn story_prompt_reflects_level_and_theme() {
        let prompt = story_task_prompt(&StoryPrompt {
            theme: Some("ocean".to_string()),
            level: StoryLevel::Beginner,
            context: Vec::new(),
            options: ExerciseOptions::default(),
        });
        assert!(prompt.contains("100-150"));
        assert!(prompt.contains("Focus on theme: ocean"));
        assert!(!prompt.contains("Reference context"));
    }
}
