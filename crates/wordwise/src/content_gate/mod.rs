//! Content quality gate - keeps templated or half-translated generator output
//! away from learners.
//!
//! Translation and example-sentence failures are absorbed here: a slot that
//! cannot be synthesized is filled by duplicating the language already known.

pub mod assessment;
pub mod bilingual;
pub mod comprehension;
pub mod repair;
pub mod templates;

pub use assessment::{assess_exercise, assess_story, QualityIssue};
pub use bilingual::{contains_cjk, ensure_bilingual_text, strip_language_labels, BilingualPair};
pub use comprehension::split_story_text_to_blocks;
pub use templates::{looks_template_definition, looks_template_example, looks_template_quiz_choice};

use tracing::debug;

use crate::capabilities::{Capabilities, Language};
use crate::exercise::{ExerciseOptions, VocabExercise};

pub struct QualityGate<'a> {
    capabilities: &'a Capabilities,
    options: ExerciseOptions,
}

impl<'a> QualityGate<'a> {
    pub fn new(capabilities: &'a Capabilities, options: ExerciseOptions) -> Self {
        Self { capabilities, options }
    }

    pub fn options(&self) -> ExerciseOptions {
        self.options
    }

    /// Clean a generated exercise; when both languages are wanted, repair the
    /// definition, example and quiz so every field carries both.
    pub async fn gate_exercise(&self, exercise: VocabExercise, word: &str) -> VocabExercise {
        let answer = exercise.quiz_answer;
        let choices = exercise
            .quiz_choices
            .iter()
            .map(|(key, text)| (*key, strip_language_labels(text)))
            .collect();
        let mut gated = VocabExercise {
            definition: strip_language_labels(&exercise.definition),
            example_sentence: strip_language_labels(&exercise.example_sentence),
            quiz_question: strip_language_labels(&exercise.quiz_question),
            quiz_choices: choices,
            quiz_answer: answer,
        };

        if !self.options.wants_bilingual() {
            return gated;
        }

        gated.definition = self
            .repair_definition(&gated.definition, &gated.quiz_choices, answer, word)
            .await;
        gated.example_sentence = self
            .repair_example(&gated.example_sentence, &gated.definition, word)
            .await;
        let (question, choices) = self
            .repair_quiz(word, &gated.quiz_question, &gated.quiz_choices, answer, &gated.definition)
            .await;
        gated.quiz_question = question;
        gated.quiz_choices = choices;
        gated
    }

    /// Translation of `text`, or `fallback` when the translator fails or answers
    /// with nothing.
    pub(crate) async fn translate_or(&self, text: &str, target: Language, fallback: &str) -> String {
        match self.capabilities.translate(text, target).await {
            Ok(translated) => {
                let cleaned = strip_language_labels(&translated);
                let cleaned = cleaned.trim();
                if cleaned.is_empty() {
                    fallback.to_string()
                } else {
                    cleaned.to_string()
                }
            }
            Err(e) => {
                debug!("Translation to {} skipped: {}", target.name(), e);
                fallback.to_string()
            }
        }
    }

    /// Synthesize whichever slot is missing by translation, duplicating the
    /// known slot when translation fails.
    pub(crate) async fn complete_pair(&self, mut pair: BilingualPair) -> BilingualPair {
        if pair.english.is_empty() && !pair.chinese.is_empty() {
            pair.english = self.translate_or(&pair.chinese, Language::English, &pair.chinese).await;
        } else if pair.chinese.is_empty() && !pair.english.is_empty() {
            pair.chinese = self.translate_or(&pair.english, Language::Chinese, &pair.english).await;
        }
        pair
    }

    /// Label-strip `text`, take `fallback_text` when it holds neither language,
    /// complete both slots and compose by direction.
    pub async fn normalize_bilingual_line(&self, text: &str, fallback_text: &str) -> String {
        let cleaned = strip_language_labels(text);
        let mut pair = BilingualPair::split(&cleaned);
        if pair.is_empty() && !fallback_text.trim().is_empty() {
            pair = BilingualPair::split(&strip_language_labels(fallback_text));
        }
        if pair.is_empty() {
            return cleaned;
        }
        self.complete_pair(pair).await.compose(self.options.direction)
    }
}
