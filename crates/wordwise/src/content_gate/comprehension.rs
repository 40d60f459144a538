//! Normalization of generated comprehension stories: bilingual blocks, exactly
//! three typed questions with evidence pointers, and a short key-vocabulary list.

use crate::capabilities::Language;
use crate::content_gate::bilingual::{contains_cjk, strip_language_labels, BilingualPair};
use crate::content_gate::QualityGate;
use crate::exercise::{
    ChoiceKey, Choices, ComprehensionExercise, ComprehensionQuestion, GeneratedStory, KeyVocabulary,
    LearningDirection, QuestionType, RawQuestion, StoryBlock, StoryLevel,
};

const QUESTION_COUNT: usize = 3;
const KEY_VOCABULARY_LIMIT: usize = 5;

/// Pair each English line with the Chinese line that follows it. An English line
/// without a following Chinese line becomes a block of its own, duplicated.
pub fn split_story_text_to_blocks(text: &str) -> Vec<StoryBlock> {
    let mut blocks = Vec::new();
    let mut pending_english: Option<&str> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if contains_cjk(line) {
            let english = pending_english.take().unwrap_or(line);
            blocks.push(StoryBlock {
                english: english.to_string(),
                chinese: line.to_string(),
            });
        } else if let Some(previous) = pending_english.replace(line) {
            blocks.push(StoryBlock {
                english: previous.to_string(),
                chinese: previous.to_string(),
            });
        }
    }
    if let Some(last) = pending_english {
        blocks.push(StoryBlock {
            english: last.to_string(),
            chinese: last.to_string(),
        });
    }
    blocks
}

pub fn default_explanation(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Vocabulary => "Look at how the key word is used in the story sentence.",
        QuestionType::Inference => "Use clues from the story to think about the best answer.",
        QuestionType::Literal => "Find the exact clue sentence in the story.",
    }
}

/// Clamp a generator-supplied block index into range; without one, point at the
/// block matching the question's position.
fn evidence_index(raw: Option<i64>, position: usize, block_count: usize) -> usize {
    let last = block_count.saturating_sub(1);
    match raw {
        Some(index) if block_count > 0 => index.clamp(0, last as i64) as usize,
        Some(_) => 0,
        None => position.min(last),
    }
}

fn compose_story_text(blocks: &[StoryBlock], direction: Option<LearningDirection>) -> String {
    let mut lines = Vec::with_capacity(blocks.len() * 2);
    for block in blocks {
        match direction {
            Some(LearningDirection::ZhToEn) => lines.extend([block.chinese.as_str(), block.english.as_str()]),
            _ => lines.extend([block.english.as_str(), block.chinese.as_str()]),
        }
    }
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn empty_question() -> RawQuestion {
    RawQuestion {
        question: String::new(),
        choices: Choices::new(),
        answer: ChoiceKey::A,
        question_type: None,
        explanation_en: None,
        explanation_zh: None,
        evidence_block_index: None,
    }
}

fn non_empty(text: Option<&String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl QualityGate<'_> {
    /// Turn a generated story into a deliverable exercise, borrowing from
    /// `fallback` wherever the generated story has nothing usable.
    pub async fn normalize_story(
        &self,
        story: GeneratedStory,
        fallback: &GeneratedStory,
        level: StoryLevel,
    ) -> ComprehensionExercise {
        let cleaned_text = strip_language_labels(&story.story_text);
        let blocks = self
            .normalize_blocks(&story.blocks, &cleaned_text, &fallback.blocks)
            .await;
        let composed = compose_story_text(&blocks, self.options.direction);
        let story_text = if composed.is_empty() { cleaned_text } else { composed };

        let questions = self
            .normalize_questions(&story.questions, &fallback.questions, blocks.len())
            .await;
        let key_vocabulary = self
            .normalize_key_vocabulary(&story.key_vocabulary, &fallback.key_vocabulary)
            .await;

        let title = strip_language_labels(&story.title).trim().to_string();
        let image_description = story.image_description.trim().to_string();

        ComprehensionExercise {
            title: if title.is_empty() { fallback.title.clone() } else { title },
            story_text,
            blocks,
            key_vocabulary,
            image_description: if image_description.is_empty() {
                fallback.image_description.clone()
            } else {
                image_description
            },
            questions,
            level,
        }
    }

    async fn normalize_blocks(
        &self,
        raw_blocks: &[StoryBlock],
        story_text: &str,
        fallback_blocks: &[StoryBlock],
    ) -> Vec<StoryBlock> {
        let mut source = raw_blocks.to_vec();
        if source.is_empty() {
            source = split_story_text_to_blocks(story_text);
        }
        if source.is_empty() {
            source = fallback_blocks.to_vec();
        }

        let mut normalized = Vec::with_capacity(source.len());
        for (index, block) in source.iter().enumerate() {
            let raw_text = strip_language_labels(&format!("{}\n{}", block.english, block.chinese));
            let mut pair = BilingualPair::split(&raw_text);
            if pair.is_empty() {
                if let Some(fallback) = fallback_blocks.get(index) {
                    pair = BilingualPair::new(fallback.english.as_str(), fallback.chinese.as_str());
                }
            }
            if pair.is_empty() {
                continue;
            }
            let mut pair = self.complete_pair(pair).await;
            pair.duplicate_missing();
            normalized.push(StoryBlock {
                english: pair.english,
                chinese: pair.chinese,
            });
        }
        normalized
    }

    async fn normalize_questions(
        &self,
        raw_questions: &[RawQuestion],
        fallback_questions: &[RawQuestion],
        block_count: usize,
    ) -> Vec<ComprehensionQuestion> {
        let blank = empty_question();
        let mut normalized = Vec::with_capacity(QUESTION_COUNT);

        for index in 0..QUESTION_COUNT {
            let fallback = fallback_questions.get(index).unwrap_or(&blank);
            let use_fallback = index >= raw_questions.len();
            let source = raw_questions.get(index).unwrap_or(fallback);

            let question_type = match source.question_type.as_deref() {
                Some(raw) => QuestionType::parse(raw),
                None => fallback.question_type.as_deref().and_then(QuestionType::parse),
            }
            .unwrap_or_else(|| QuestionType::for_position(index));

            let fallback_question = if use_fallback { fallback.question.as_str() } else { "" };
            let question = self
                .normalize_bilingual_line(&source.question, fallback_question)
                .await;

            let mut choices = Choices::new();
            for key in ChoiceKey::ALL {
                let raw = source.choices.get(&key).map(String::as_str).unwrap_or("");
                let fallback_choice = fallback.choices.get(&key).map(String::as_str).unwrap_or("");
                let mut text = self
                    .normalize_bilingual_line(raw, if use_fallback { fallback_choice } else { "" })
                    .await;
                if text.trim().is_empty() {
                    let seed = if fallback_choice.trim().is_empty() {
                        format!("Option {}", key)
                    } else {
                        fallback_choice.trim().to_string()
                    };
                    text = self.normalize_bilingual_line(&seed, "").await;
                }
                choices.insert(key, text);
            }

            let explanation_en = non_empty(source.explanation_en.as_ref())
                .or_else(|| {
                    use_fallback
                        .then(|| non_empty(fallback.explanation_en.as_ref()))
                        .flatten()
                })
                .unwrap_or_else(|| default_explanation(question_type).to_string());

            let explanation_zh = match non_empty(source.explanation_zh.as_ref()) {
                Some(text) => text,
                None => match use_fallback
                    .then(|| non_empty(fallback.explanation_zh.as_ref()))
                    .flatten()
                {
                    Some(text) => text,
                    None => {
                        self.translate_or(&explanation_en, Language::Chinese, &explanation_en)
                            .await
                    }
                },
            };

            let evidence_block_index = evidence_index(
                source.evidence_block_index.or(fallback.evidence_block_index),
                index,
                block_count,
            );

            normalized.push(ComprehensionQuestion {
                question,
                choices,
                answer: source.answer,
                question_type,
                explanation_en,
                explanation_zh,
                evidence_block_index,
            });
        }
        normalized
    }

    async fn normalize_key_vocabulary(
        &self,
        raw: &[KeyVocabulary],
        fallback: &[KeyVocabulary],
    ) -> Vec<KeyVocabulary> {
        let source = if raw.is_empty() { fallback } else { raw };
        let mut normalized = Vec::new();
        for item in source {
            let word = item.word.trim();
            let meaning_en = item.meaning_en.trim();
            if word.is_empty() || meaning_en.is_empty() {
                continue;
            }
            let meaning_zh = match item.meaning_zh.trim() {
                "" => self.translate_or(meaning_en, Language::Chinese, meaning_en).await,
                text => text.to_string(),
            };
            normalized.push(KeyVocabulary {
                word: word.to_string(),
                meaning_en: meaning_en.to_string(),
                meaning_zh,
            });
            if normalized.len() >= KEY_VOCABULARY_LIMIT {
                break;
            }
        }
        normalized
    }
}
