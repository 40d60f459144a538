//! Provider used when no hosted model is configured

use async_trait::async_trait;

use crate::capabilities::{ContentGenerator, Embedder, ExercisePrompt, Language, StoryPrompt, Translator};
use crate::error::{Result, TutorError};
use crate::exercise::{GeneratedStory, VocabExercise};

const REASON: &str = "no provider configured";

/// Every call is unavailable, which routes the engine to its fallback content
/// and turns context storage and retrieval into no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait]
impl Embedder for OfflineProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(TutorError::unavailable("embedding", REASON))
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

#[async_trait]
impl Translator for OfflineProvider {
    async fn translate(&self, _text: &str, _target: Language) -> Result<String> {
        Err(TutorError::unavailable("translation", REASON))
    }
}

#[async_trait]
impl ContentGenerator for OfflineProvider {
    async fn generate_exercise(&self, _prompt: &ExercisePrompt) -> Result<VocabExercise> {
        Err(TutorError::unavailable("generation", REASON))
    }

    async fn generate_story(&self, _prompt: &StoryPrompt) -> Result<GeneratedStory> {
        Err(TutorError::unavailable("generation", REASON))
    }

    async fn generate_example_sentence(&self, _word: &str, _definition: &str) -> Result<String> {
        Err(TutorError::unavailable("generation", REASON))
    }
}
