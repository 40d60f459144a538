//! Learner state, practice recommendation and context retrieval engine for a
//! children's vocabulary and reading-comprehension tutor.

pub mod capabilities;
pub mod config;
pub mod content_gate;
pub mod context_engine;
pub mod error;
pub mod exercise;
pub mod learner_db;
pub mod recommendation;
pub mod telemetry;
pub mod utils;

// Public API exports
pub use capabilities::{Capabilities, ContentGenerator, Embedder, Language, Translator};
pub use config::Config;
pub use content_gate::{QualityGate, QualityIssue};
pub use context_engine::ContextStore;
pub use error::{Result, TutorError};
pub use exercise::{
    check_answer, ComprehensionExercise, ContentSource, DeliveredComprehension, DeliveredExercise,
    ExerciseOptions, ExerciseService, LearningDirection, OutputStyle, StoryLevel, VocabExercise,
};
pub use learner_db::{ExerciseKind, LearnerDatabase};
pub use recommendation::{RecommendationPolicy, Recommender};
