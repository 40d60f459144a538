//! Boundary validation of generator JSON into typed records.
//!
//! Any shape violation is reported as the generation capability being
//! unavailable, which sends the caller to the deterministic fallback.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{Result, TutorError};
use crate::exercise::{
    ChoiceKey, Choices, GeneratedStory, KeyVocabulary, RawQuestion, StoryBlock, VocabExercise,
};

const CAPABILITY: &str = "generation";

#[derive(Deserialize)]
struct ExerciseWire {
    definition: String,
    example_sentence: String,
    quiz_question: String,
    quiz_choices: BTreeMap<String, String>,
    quiz_answer: String,
}

#[derive(Deserialize)]
struct StoryWire {
    story_title: String,
    image_description: String,
    #[serde(default)]
    story_text: Option<String>,
    #[serde(default)]
    story_blocks: Option<Vec<BlockWire>>,
    #[serde(default)]
    key_vocabulary: Option<Vec<KeyVocabularyWire>>,
    questions: Vec<QuestionWire>,
}

#[derive(Deserialize)]
struct QuestionWire {
    question: String,
    choices: BTreeMap<String, String>,
    answer: String,
    #[serde(default)]
    question_type: Option<String>,
    #[serde(default)]
    explanation_en: Option<String>,
    #[serde(default)]
    explanation_zh: Option<String>,
    #[serde(default)]
    evidence_block_index: Option<i64>,
}

/// Generators emit blocks as `{english, chinese}` pairs or bare lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlockWire {
    Pair {
        #[serde(default)]
        english: String,
        #[serde(default)]
        chinese: String,
    },
    Line(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
struct KeyVocabularyWire {
    #[serde(default)]
    word: String,
    #[serde(default)]
    meaning_en: String,
    #[serde(default)]
    meaning_zh: String,
}

fn invalid(reason: impl Into<String>) -> TutorError {
    TutorError::unavailable(CAPABILITY, reason.into())
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw.trim()).map_err(|e| invalid(format!("malformed response: {}", e)))
}

/// Choice map whose key set is exactly {A, B, C}.
fn to_choices(raw: BTreeMap<String, String>) -> Result<Choices> {
    let mut choices = Choices::new();
    for (key, text) in raw {
        let letter = match key.as_str() {
            "A" => ChoiceKey::A,
            "B" => ChoiceKey::B,
            "C" => ChoiceKey::C,
            other => return Err(invalid(format!("unexpected choice key {:?}", other))),
        };
        choices.insert(letter, text);
    }
    if choices.len() != ChoiceKey::ALL.len() {
        return Err(invalid("choices must have exactly the keys A, B and C"));
    }
    Ok(choices)
}

/// Exactly `A`, `B` or `C`.
fn to_answer(raw: &str) -> Result<ChoiceKey> {
    match raw {
        "A" | "B" | "C" => ChoiceKey::parse(raw).ok_or_else(|| invalid("answer must be A, B or C")),
        _ => Err(invalid("answer must be A, B or C")),
    }
}

/// Validate a vocabulary exercise payload.
pub fn parse_exercise(raw: &str) -> Result<VocabExercise> {
    let wire: ExerciseWire = decode(raw)?;
    Ok(VocabExercise {
        definition: wire.definition,
        example_sentence: wire.example_sentence,
        quiz_question: wire.quiz_question,
        quiz_choices: to_choices(wire.quiz_choices)?,
        quiz_answer: to_answer(&wire.quiz_answer)?,
    })
}

impl QuestionWire {
    fn into_question(self) -> Result<RawQuestion> {
        Ok(RawQuestion {
            question: self.question,
            choices: to_choices(self.choices)?,
            answer: to_answer(&self.answer)?,
            question_type: self.question_type,
            explanation_en: self.explanation_en,
            explanation_zh: self.explanation_zh,
            evidence_block_index: self.evidence_block_index,
        })
    }
}

/// Validate a comprehension story payload: title, image description, story text
/// or blocks, and exactly three well-formed questions. Unrecognized block entries
/// are dropped; the quality gate rebuilds blocks from the text when none survive.
pub fn parse_story(raw: &str) -> Result<GeneratedStory> {
    let wire: StoryWire = decode(raw)?;

    let blocks: Vec<StoryBlock> = wire
        .story_blocks
        .unwrap_or_default()
        .into_iter()
        .filter_map(|block| match block {
            BlockWire::Pair { english, chinese } => Some(StoryBlock { english, chinese }),
            BlockWire::Line(english) => Some(StoryBlock {
                english,
                chinese: String::new(),
            }),
            BlockWire::Other(_) => None,
        })
        .collect();
    let story_text = wire.story_text.unwrap_or_default();
    if story_text.trim().is_empty() && blocks.is_empty() {
        return Err(invalid("story needs story_text or story_blocks"));
    }

    if wire.questions.len() != 3 {
        return Err(invalid(format!("expected exactly 3 questions, got {}", wire.questions.len())));
    }
    let questions = wire
        .questions
        .into_iter()
        .map(QuestionWire::into_question)
        .collect::<Result<Vec<_>>>()?;

    let key_vocabulary = wire
        .key_vocabulary
        .unwrap_or_default()
        .into_iter()
        .map(|entry| KeyVocabulary {
            word: entry.word,
            meaning_en: entry.meaning_en,
            meaning_zh: entry.meaning_zh,
        })
        .collect();

    Ok(GeneratedStory {
        title: wire.story_title,
        story_text,
        blocks,
        key_vocabulary,
        questions,
        image_description: wire.image_description,
    })
}
