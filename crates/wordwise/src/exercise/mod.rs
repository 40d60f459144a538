//! Exercise records, the deterministic fallback dataset and the generation pipeline

pub mod fallback;
pub mod pipeline;

pub use pipeline::{DeliveredComprehension, DeliveredExercise, ExerciseService, GenerationState};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Multiple-choice letter. Exactly three per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChoiceKey {
    A,
    B,
    C,
}

impl ChoiceKey {
    pub const ALL: [ChoiceKey; 3] = [ChoiceKey::A, ChoiceKey::B, ChoiceKey::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChoiceKey::A => "A",
            ChoiceKey::B => "B",
            ChoiceKey::C => "C",
        }
    }

    /// Trimmed, case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "A" => Some(ChoiceKey::A),
            "B" => Some(ChoiceKey::B),
            "C" => Some(ChoiceKey::C),
            _ => None,
        }
    }
}

impl fmt::Display for ChoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Choices = BTreeMap<ChoiceKey, String>;

/// Trimmed, case-insensitive comparison of a selected letter against the key.
pub fn check_answer(selected: &str, correct: &str) -> bool {
    selected.trim().to_uppercase() == correct.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", value(rename_all = "snake_case"))]
pub enum LearningDirection {
    /// English speaker learning Chinese.
    EnToZh,
    /// Chinese speaker learning English.
    ZhToEn,
    Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum OutputStyle {
    #[default]
    Immersion,
    Bilingual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseOptions {
    pub direction: Option<LearningDirection>,
    pub style: OutputStyle,
}

impl ExerciseOptions {
    /// Both languages are expected in every field.
    pub fn wants_bilingual(&self) -> bool {
        self.style == OutputStyle::Bilingual || self.direction == Some(LearningDirection::Both)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum StoryLevel {
    Beginner,
    #[default]
    Intermediate,
    Expert,
}

impl StoryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLevel::Beginner => "beginner",
            StoryLevel::Intermediate => "intermediate",
            StoryLevel::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Llm,
    Fallback,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Llm => "llm",
            ContentSource::Fallback => "fallback",
        }
    }
}

/// A vocabulary exercise as generated and, after gating, as delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabExercise {
    pub definition: String,
    pub example_sentence: String,
    pub quiz_question: String,
    pub quiz_choices: Choices,
    pub quiz_answer: ChoiceKey,
}

impl VocabExercise {
    pub fn correct_choice(&self) -> &str {
        self.quiz_choices
            .get(&self.quiz_answer)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBlock {
    pub english: String,
    pub chinese: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVocabulary {
    pub word: String,
    pub meaning_en: String,
    pub meaning_zh: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Literal,
    Vocabulary,
    Inference,
}

impl QuestionType {
    /// Default type for the question at `index`: literal, vocabulary, inference.
    pub fn for_position(index: usize) -> Self {
        match index {
            0 => QuestionType::Literal,
            1 => QuestionType::Vocabulary,
            _ => QuestionType::Inference,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "literal" => Some(QuestionType::Literal),
            "vocabulary" => Some(QuestionType::Vocabulary),
            "inference" => Some(QuestionType::Inference),
            _ => None,
        }
    }
}

/// A comprehension question before normalization. Optional fields may be absent
/// or malformed in generator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    pub question: String,
    pub choices: Choices,
    pub answer: ChoiceKey,
    pub question_type: Option<String>,
    pub explanation_en: Option<String>,
    pub explanation_zh: Option<String>,
    pub evidence_block_index: Option<i64>,
}

/// Story payload as produced by a generator or the fallback dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedStory {
    pub title: String,
    pub story_text: String,
    pub blocks: Vec<StoryBlock>,
    pub key_vocabulary: Vec<KeyVocabulary>,
    pub questions: Vec<RawQuestion>,
    pub image_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensionQuestion {
    pub question: String,
    pub choices: Choices,
    pub answer: ChoiceKey,
    pub question_type: QuestionType,
    pub explanation_en: String,
    pub explanation_zh: String,
    pub evidence_block_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensionExercise {
    pub title: String,
    pub story_text: String,
    pub blocks: Vec<StoryBlock>,
    pub key_vocabulary: Vec<KeyVocabulary>,
    pub image_description: String,
    pub questions: Vec<ComprehensionQuestion>,
    pub level: StoryLevel,
}
