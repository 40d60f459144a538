//! Post-repair quality checks. A non-empty issue list means the content must
//! not be delivered as is.

use serde::Serialize;
use std::fmt;

use crate::content_gate::templates::{
    looks_template_definition, looks_template_example, looks_template_quiz_choice,
};
use crate::exercise::{ChoiceKey, ComprehensionExercise, VocabExercise};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    TemplatedDefinition,
    TemplatedExample,
    EmptyQuestion,
    EmptyChoice(ChoiceKey),
    TemplatedAnswerChoice,
    MissingStory,
    QuestionCount(usize),
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::TemplatedDefinition => write!(f, "definition is templated or empty"),
            QualityIssue::TemplatedExample => write!(f, "example sentence is templated or empty"),
            QualityIssue::EmptyQuestion => write!(f, "question is empty"),
            QualityIssue::EmptyChoice(key) => write!(f, "choice {} is empty", key),
            QualityIssue::TemplatedAnswerChoice => write!(f, "correct choice is templated"),
            QualityIssue::MissingStory => write!(f, "story has no blocks"),
            QualityIssue::QuestionCount(n) => write!(f, "expected 3 questions, found {}", n),
        }
    }
}

pub fn assess_exercise(exercise: &VocabExercise, word: &str) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if looks_template_definition(&exercise.definition) {
        issues.push(QualityIssue::TemplatedDefinition);
    }
    if looks_template_example(&exercise.example_sentence) {
        issues.push(QualityIssue::TemplatedExample);
    }
    if exercise.quiz_question.trim().is_empty() {
        issues.push(QualityIssue::EmptyQuestion);
    }
    for key in ChoiceKey::ALL {
        let empty = exercise
            .quiz_choices
            .get(&key)
            .map_or(true, |text| text.trim().is_empty());
        if empty {
            issues.push(QualityIssue::EmptyChoice(key));
        }
    }
    if looks_template_quiz_choice(exercise.correct_choice(), word) {
        issues.push(QualityIssue::TemplatedAnswerChoice);
    }
    issues
}

pub fn assess_story(story: &ComprehensionExercise) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if story.blocks.is_empty() || story.story_text.trim().is_empty() {
        issues.push(QualityIssue::MissingStory);
    }
    if story.questions.len() != 3 {
        issues.push(QualityIssue::QuestionCount(story.questions.len()));
    }
    for question in &story.questions {
        if question.question.trim().is_empty() {
            issues.push(QualityIssue::EmptyQuestion);
        }
        for key in ChoiceKey::ALL {
            if question.choices.get(&key).map_or(true, |c| c.trim().is_empty()) {
                issues.push(QualityIssue::EmptyChoice(key));
            }
        }
    }
    issues
}
