//! Row types for the learner database
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TutorError;

/// A named practice profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learner {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Quiz,
    Pronunciation,
    Comprehension,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Quiz => "quiz",
            ExerciseKind::Pronunciation => "pronunciation",
            ExerciseKind::Comprehension => "comprehension",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quiz" => Ok(ExerciseKind::Quiz),
            "pronunciation" => Ok(ExerciseKind::Pronunciation),
            "comprehension" => Ok(ExerciseKind::Comprehension),
            other => Err(TutorError::validation(format!("unknown exercise kind: {:?}", other))),
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub learner_id: i64,
    pub word: String,
    pub kind: ExerciseKind,
    pub score: u8,
    pub correct: bool,
    pub created_at: DateTime<Utc>,
}

/// Per learner+word statistics derived from the ledger on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordAggregate {
    pub word: String,
    pub attempts: u32,
    pub avg_score: f64,
    pub min_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindStats {
    pub avg_score: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakWordStat {
    pub word: String,
    pub avg_score: f64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_exercises: u32,
    pub correct_count: u32,
    pub accuracy: f64,
    pub scores_by_kind: BTreeMap<ExerciseKind, KindStats>,
    pub weak_words: Vec<WeakWordStat>,
}

/// Archived generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub learner_id: Option<i64>,
    pub doc_type: String,
    pub text: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for a document + embedding pair insert.
#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub learner_id: Option<i64>,
    pub doc_type: &'a str,
    pub text: &'a str,
    pub metadata: Option<&'a serde_json::Value>,
    pub embedding: &'a [f32],
    pub embedding_model: &'a str,
}

/// A document text joined with its decoded embedding, as scanned for retrieval.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub doc_id: i64,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_learners: i64,
    pub total_attempts: i64,
    pub total_study_days: i64,
    pub total_documents: i64,
    pub total_embeddings: i64,
    pub total_custom_words: i64,
    pub database_size_bytes: i64,
}

/// Fixed-width UTC timestamp so lexical and chronological order agree.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_timestamp() -> (DateTime<Utc>, String) {
    let now = Utc::now();
    let text = format_timestamp(&now);
    (now, text)
}

pub(crate) fn parse_timestamp(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}
