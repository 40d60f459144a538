//! Field repairs applied when an exercise must carry both languages.

use crate::capabilities::Language;
use crate::content_gate::bilingual::{strip_language_labels, BilingualPair};
use crate::content_gate::templates::{
    looks_template_definition, looks_template_example, looks_template_quiz_choice,
};
use crate::content_gate::QualityGate;
use crate::exercise::{ChoiceKey, Choices};

impl QualityGate<'_> {
    /// A templated English definition is replaced by the correct choice's English
    /// text when that text is itself usable; a missing or templated Chinese line
    /// is translated from the English one.
    pub async fn repair_definition(
        &self,
        definition: &str,
        choices: &Choices,
        answer: ChoiceKey,
        word: &str,
    ) -> String {
        let cleaned = strip_language_labels(definition);
        let mut pair = BilingualPair::split(&cleaned);

        if looks_template_definition(&pair.english) {
            if let Some(choice) = choices.get(&answer) {
                let choice_english = BilingualPair::split(&strip_language_labels(choice)).english;
                if !looks_template_definition(&choice_english)
                    && !looks_template_quiz_choice(&choice_english, word)
                {
                    pair.english = choice_english;
                }
            }
        }

        if looks_template_definition(&pair.chinese) {
            if pair.english.is_empty() {
                return cleaned;
            }
            let fallback = pair.english.clone();
            pair.chinese = self.translate_or(&pair.english, Language::Chinese, &fallback).await;
        } else if pair.english.is_empty() {
            pair = self.complete_pair(pair).await;
        }

        pair.compose(self.options.direction)
    }

    /// A templated or missing English example is rewritten by the generator (or
    /// a fixed classroom sentence when it is unavailable); the Chinese line is
    /// then translated from it.
    pub async fn repair_example(&self, example: &str, definition: &str, word: &str) -> String {
        let cleaned = strip_language_labels(example);
        let mut pair = BilingualPair::split(&cleaned);

        let needs_english = looks_template_example(&pair.english);
        let needs_chinese = needs_english || looks_template_example(&pair.chinese);
        if !needs_english && !needs_chinese {
            return pair.compose(self.options.direction);
        }

        if needs_english {
            let definition_english = BilingualPair::split(definition).english;
            let seed = if definition_english.is_empty() {
                format!("\"{}\" has a specific meaning.", word)
            } else {
                definition_english
            };
            pair.english = match self.capabilities.generate_example_sentence(word, &seed).await {
                Ok(sentence) if !looks_template_example(&sentence) => sentence.trim().to_string(),
                _ => format!("The teacher explained \"{}\" in class today.", word),
            };
        }

        if needs_chinese {
            let fallback = if looks_template_example(&pair.chinese) {
                pair.english.clone()
            } else {
                pair.chinese.clone()
            };
            pair.chinese = self.translate_or(&pair.english, Language::Chinese, &fallback).await;
        }

        pair.compose(self.options.direction)
    }

    /// Both lines of the question, and both lines of every choice. The correct
    /// choice borrows the definition's lines when its own are templated.
    pub async fn repair_quiz(
        &self,
        word: &str,
        question: &str,
        choices: &Choices,
        answer: ChoiceKey,
        definition: &str,
    ) -> (String, Choices) {
        let definition = BilingualPair::split(definition);

        let mut question = BilingualPair::split(&strip_language_labels(question));
        if question.english.is_empty() {
            question.english = format!("Which meaning best matches \"{}\"?", word);
        }
        let question = self.complete_pair(question).await;
        let repaired_question = question.compose(self.options.direction);

        let mut repaired_choices = Choices::new();
        for (key, raw) in choices {
            let cleaned = strip_language_labels(raw);
            let mut choice = BilingualPair::split(&cleaned);
            let is_answer = *key == answer;

            if choice.english.is_empty() && !choice.chinese.is_empty() && !is_answer {
                choice.english = self
                    .translate_or(&choice.chinese, Language::English, &choice.chinese)
                    .await;
            }
            if is_answer && looks_template_quiz_choice(&choice.english, word) && !definition.english.is_empty() {
                choice.english = definition.english.clone();
            }

            if looks_template_quiz_choice(&choice.chinese, word) {
                choice.chinese = if is_answer && !definition.chinese.is_empty() {
                    definition.chinese.clone()
                } else if choice.english.is_empty() {
                    String::new()
                } else {
                    self.translate_or(&choice.english, Language::Chinese, &choice.english)
                        .await
                };
            }

            let composed = choice.compose(self.options.direction);
            let composed = if composed.is_empty() { cleaned } else { composed };
            repaired_choices.insert(*key, composed);
        }

        (repaired_question, repaired_choices)
    }
}

#[cfg(test)]
mod tests {
    use crate::content_gate::test_support::*;
    use crate::content_gate::QualityGate;
    use crate::exercise::{ChoiceKey, Choices, ExerciseOptions, LearningDirection, OutputStyle};
    use std::sync::Arc;

    fn options(direction: LearningDirection) -> ExerciseOptions {
        ExerciseOptions {
            direction: Some(direction),
            style: OutputStyle::Bilingual,
        }
    }

    fn choices(a: &str, b: &str, c: &str) -> Choices {
        let mut choices = Choices::new();
        choices.insert(ChoiceKey::A, a.to_string());
        choices.insert(ChoiceKey::B, b.to_string());
        choices.insert(ChoiceKey::C, c.to_string());
        choices
    }

    #[tokio::test]
    async fn clean_definition_is_kept() {
        let caps = capabilities(Arc::new(TaggingTranslator), None);
        let gate = QualityGate::new(&caps, options(LearningDirection::EnToZh));
        let repaired = gate
            .repair_definition("English: a baby cat\nChinese: 小猫", &choices("x", "y", "z"), ChoiceKey::A, "kitten")
            .await;
        assert_eq!(repaired, "a baby cat\n小猫");
    }

    #[tokio::test]
    async fn templated_chinese_definition_is_retranslated() {
        let caps = capabilities(Arc::new(TaggingTranslator), None);
        let gate = QualityGate::new(&caps, options(LearningDirection::EnToZh));
        let repaired = gate
            .repair_definition("a baby cat\n要学习的词", &choices("x", "y", "z"), ChoiceKey::A, "kitten")
            .await;
        assert_eq!(repaired, "a baby cat\n中文：a baby cat");
    }

    #[tokio::test]
    async fn templated_choice_is_not_borrowed() {
        let caps = capabilities(Arc::new(FailingTranslator), None);
        let gate = QualityGate::new(&caps, options(LearningDirection::EnToZh));
        let repaired = gate
            .repair_definition(
                "kitten is a word to learn",
                &choices("the meaning of kitten", "y", "z"),
                ChoiceKey::A,
                "kitten",
            )
            .await;
        // nothing better is known; the pipeline's assessment rejects this result
        assert!(repaired.contains("word to learn"));
    }

    #[tokio::test]
    async fn chinese_only_definition_gets_english() {
        let caps = capabilities(Arc::new(TaggingTranslator), None);
        let gate = QualityGate::new(&caps, options(LearningDirection::ZhToEn));
        let repaired = gate.repair_definition("小猫", &choices("", "", ""), ChoiceKey::B, "kitten").await;
        assert_eq!(repaired, "小猫\nEN(小猫)");
    }

    #[tokio::test]
    async fn good_example_is_left_alone() {
        let caps = capabilities(Arc::new(TaggingTranslator), Some("unused"));
        let gate = QualityGate::new(&caps, options(LearningDirection::EnToZh));
        let repaired = gate
            .repair_example("My kitten naps.\n我的小猫在打盹。", "a baby cat", "kitten")
            .await;
        assert_eq!(repaired, "My kitten naps.\n我的小猫在打盹。");
    }

    #[tokio::test]
    async fn templated_example_generator_output_is_rejected() {
        let caps = capabilities(Arc::new(FailingTranslator), Some("I can use the word kitten."));
        let gate = QualityGate::new(&caps, options(LearningDirection::EnToZh));
        let repaired = gate.repair_example("", "", "kitten").await;
        assert!(repaired.starts_with("The teacher explained \"kitten\" in class today.\n"));
    }

    #[tokio::test]
    async fn quiz_question_defaults_and_answer_borrows_definition() {
        let caps = capabilities(Arc::new(FailingTranslator), None);
        let gate = QualityGate::new(&caps, options(LearningDirection::EnToZh));
        let (question, repaired) = gate
            .repair_quiz(
                "kitten",
                "",
                &choices("The meaning of kitten", "一种水果", "to run"),
                ChoiceKey::A,
                "a baby cat\n小猫",
            )
            .await;

        assert_eq!(
            question,
            "Which meaning best matches \"kitten\"?\nWhich meaning best matches \"kitten\"?"
        );
        assert_eq!(repaired[&ChoiceKey::A], "a baby cat\n小猫");
        assert_eq!(repaired[&ChoiceKey::B], "一种水果\n一种水果");
        assert_eq!(repaired[&ChoiceKey::C], "to run\nto run");
    }
}
