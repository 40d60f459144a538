//! Generation pipeline: context retrieval, generation, gating, assessment with
//! a single repair round, deterministic fallback and archiving.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, ExercisePrompt, StoryPrompt};
use crate::config::Config;
use crate::content_gate::{assess_exercise, assess_story, QualityGate, QualityIssue};
use crate::context_engine::ContextStore;
use crate::error::{Result, TutorError};
use crate::exercise::fallback::{
    ensure_exercise_shape, ensure_story_shape, fallback_exercise, fallback_story,
};
use crate::exercise::{
    ComprehensionExercise, ContentSource, ExerciseOptions, GeneratedStory, StoryLevel, VocabExercise,
};
use crate::learner_db::LearnerDatabase;
use crate::utils::{phonics_hint, TextUtils};

/// Progress of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Requested,
    Generated,
    Validated,
    Repaired,
    Delivered,
}

impl GenerationState {
    fn can_advance_to(self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Requested, Generated)
                | (Generated, Validated)
                | (Validated, Repaired)
                | (Repaired, Validated)
                | (Validated, Delivered)
        )
    }

    fn advance(self, next: GenerationState) -> GenerationState {
        debug_assert!(self.can_advance_to(next), "{:?} -> {:?}", self, next);
        debug!("Generation {:?} -> {:?}", self, next);
        next
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveredExercise {
    pub word: String,
    #[serde(flatten)]
    pub exercise: VocabExercise,
    pub phonics: String,
    pub source: ContentSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveredComprehension {
    #[serde(flatten)]
    pub exercise: ComprehensionExercise,
    pub source: ContentSource,
}

/// Errors after which the fallback dataset is delivered instead.
fn falls_back(error: &TutorError) -> bool {
    error.is_capability_unavailable() || matches!(error, TutorError::Validation(_))
}

fn describe(issues: &[QualityIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

pub struct ExerciseService {
    capabilities: Capabilities,
    context: ContextStore,
}

impl ExerciseService {
    pub fn new(capabilities: Capabilities, context: ContextStore) -> Self {
        Self { capabilities, context }
    }

    pub fn from_config(database: Arc<LearnerDatabase>, config: &Config) -> Self {
        let capabilities = Capabilities::from_config(config);
        let context = ContextStore::new(database, capabilities.clone(), config.retrieval.clone());
        Self::new(capabilities, context)
    }

    pub fn context_store(&self) -> &ContextStore {
        &self.context
    }

    /// Generate, gate and assess an exercise. A low-quality result earns one
    /// more generator call; a second low-quality result is a validation error.
    pub async fn generate_validated_exercise(&self, prompt: &ExercisePrompt) -> Result<VocabExercise> {
        let gate = QualityGate::new(&self.capabilities, prompt.options);
        let mut state = GenerationState::Requested;
        let mut repaired = false;

        let mut generated = self.capabilities.generate_exercise(prompt).await?;
        state = state.advance(GenerationState::Generated);

        loop {
            let gated = gate.gate_exercise(generated, &prompt.word).await;
            state = state.advance(GenerationState::Validated);

            let issues = assess_exercise(&gated, &prompt.word);
            if issues.is_empty() {
                state.advance(GenerationState::Delivered);
                return Ok(gated);
            }
            if repaired {
                return Err(TutorError::validation(format!(
                    "low-quality exercise for {:?} after regeneration: {}",
                    prompt.word,
                    describe(&issues)
                )));
            }

            warn!("Regenerating exercise for {:?}: {}", prompt.word, describe(&issues));
            state = state.advance(GenerationState::Repaired);
            repaired = true;
            generated = self.capabilities.generate_exercise(prompt).await?;
        }
    }

    /// Same contract as [`generate_validated_exercise`](Self::generate_validated_exercise)
    /// for comprehension stories.
    pub async fn generate_validated_story(
        &self,
        prompt: &StoryPrompt,
        fallback: &GeneratedStory,
    ) -> Result<ComprehensionExercise> {
        let gate = QualityGate::new(&self.capabilities, prompt.options);
        let mut state = GenerationState::Requested;
        let mut repaired = false;

        let mut generated = self.capabilities.generate_story(prompt).await?;
        state = state.advance(GenerationState::Generated);

        loop {
            let normalized = gate.normalize_story(generated, fallback, prompt.level).await;
            state = state.advance(GenerationState::Validated);

            let issues = assess_story(&normalized);
            if issues.is_empty() {
                state.advance(GenerationState::Delivered);
                return Ok(normalized);
            }
            if repaired {
                return Err(TutorError::validation(format!(
                    "low-quality story after regeneration: {}",
                    describe(&issues)
                )));
            }

            warn!("Regenerating story: {}", describe(&issues));
            state = state.advance(GenerationState::Repaired);
            repaired = true;
            generated = self.capabilities.generate_story(prompt).await?;
        }
    }

    pub async fn vocab_exercise(
        &self,
        word: &str,
        learner_id: Option<i64>,
        options: ExerciseOptions,
    ) -> Result<DeliveredExercise> {
        let word = TextUtils::sanitize_word(word)?;
        let context = self
            .context
            .context_for(&format!("vocabulary word {}", word), learner_id)
            .await;
        let prompt = ExercisePrompt {
            word: word.clone(),
            context,
            options,
        };

        let (exercise, source) = match self.generate_validated_exercise(&prompt).await {
            Ok(exercise) => (exercise, ContentSource::Llm),
            Err(e) if falls_back(&e) => {
                warn!("Delivering fallback exercise for {:?}: {}", word, e);
                let exercise = fallback_exercise(&word, &options);
                ensure_exercise_shape(&exercise)?;
                (exercise, ContentSource::Fallback)
            }
            Err(e) => return Err(e),
        };

        let phonics = phonics_hint(&word);
        let document = format!(
            "Word: {}\nDefinition: {}\nExample: {}\nPhonics: {}",
            word, exercise.definition, exercise.example_sentence, phonics
        );
        let metadata = json!({ "word": word, "source": source.as_str() });
        self.context
            .store(&document, "vocab_exercise", learner_id, Some(&metadata))
            .await;

        info!("Delivered {} exercise for {:?}", source.as_str(), word);
        Ok(DeliveredExercise {
            word,
            exercise,
            phonics,
            source,
        })
    }

    pub async fn comprehension_exercise(
        &self,
        level: StoryLevel,
        theme: Option<&str>,
        learner_id: Option<i64>,
        options: ExerciseOptions,
    ) -> Result<DeliveredComprehension> {
        let theme = theme.map(str::trim).filter(|t| !t.is_empty());
        let query = match theme {
            Some(theme) => theme.to_string(),
            None => format!("children story level {}", level.as_str()),
        };
        let context = self.context.context_for(&query, learner_id).await;
        let prompt = StoryPrompt {
            theme: theme.map(str::to_string),
            level,
            context,
            options,
        };
        let fallback = fallback_story(&options);

        let (exercise, source) = match self.generate_validated_story(&prompt, &fallback).await {
            Ok(exercise) => (exercise, ContentSource::Llm),
            Err(e) if falls_back(&e) => {
                warn!("Delivering fallback story: {}", e);
                let gate = QualityGate::new(&self.capabilities, options);
                let exercise = gate.normalize_story(fallback.clone(), &fallback, level).await;
                ensure_story_shape(&exercise)?;
                (exercise, ContentSource::Fallback)
            }
            Err(e) => return Err(e),
        };

        let questions = exercise
            .questions
            .iter()
            .map(|q| format!("- {}", q.question))
            .collect::<Vec<_>>()
            .join("\n");
        let document = format!(
            "Title: {}\nStory: {}\nQuestions:\n{}",
            exercise.title, exercise.story_text, questions
        );
        let metadata = json!({
            "level": level.as_str(),
            "theme": theme,
            "source": source.as_str(),
        });
        self.context
            .store(&document, "comprehension_story", learner_id, Some(&metadata))
            .await;

        info!("Delivered {} {} story", source.as_str(), level.as_str());
        Ok(DeliveredComprehension { exercise, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{ContentGenerator, Embedder, OfflineProvider, Translator};
    use crate::config::RetrievalConfig;
    use crate::content_gate::test_support::{FailingTranslator, TaggingTranslator};
    use crate::exercise::{ChoiceKey, Choices, LearningDirection, OutputStyle};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Hands out queued exercises in order, then reports itself unavailable.
    #[derive(Default)]
    struct ScriptedGenerator {
        exercises: Mutex<VecDeque<VocabExercise>>,
        stories: Mutex<VecDeque<GeneratedStory>>,
        contexts: Mutex<Vec<Vec<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn with_exercises(exercises: Vec<VocabExercise>) -> Arc<Self> {
            Arc::new(Self {
                exercises: Mutex::new(exercises.into()),
                ..Self::default()
            })
        }

        fn with_stories(stories: Vec<GeneratedStory>) -> Arc<Self> {
            Arc::new(Self {
                stories: Mutex::new(stories.into()),
                ..Self::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate_exercise(&self, prompt: &ExercisePrompt) -> Result<VocabExercise> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(prompt.context.clone());
            self.exercises
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TutorError::unavailable("generation", "script exhausted"))
        }

        async fn generate_story(&self, _prompt: &StoryPrompt) -> Result<GeneratedStory> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.stories
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TutorError::unavailable("generation", "script exhausted"))
        }

        async fn generate_example_sentence(&self, _word: &str, _definition: &str) -> Result<String> {
            Err(TutorError::unavailable("generation", "not scripted"))
        }
    }

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.5])
        }

        fn model_name(&self) -> &str {
            "constant"
        }
    }

    fn good_exercise() -> VocabExercise {
        let mut choices = Choices::new();
        choices.insert(ChoiceKey::A, "a baby cat".to_string());
        choices.insert(ChoiceKey::B, "a kind of fruit".to_string());
        choices.insert(ChoiceKey::C, "to jump".to_string());
        VocabExercise {
            definition: "a baby cat".to_string(),
            example_sentence: "The kitten naps in a box.".to_string(),
            quiz_question: "What is a kitten?".to_string(),
            quiz_choices: choices,
            quiz_answer: ChoiceKey::A,
        }
    }

    fn templated_exercise() -> VocabExercise {
        VocabExercise {
            definition: "kitten is a word to learn".to_string(),
            example_sentence: "I can use the word kitten today.".to_string(),
            ..good_exercise()
        }
    }

    fn service(
        generator: Arc<dyn ContentGenerator>,
        translator: Arc<dyn Translator>,
        retrieval: RetrievalConfig,
    ) -> (Arc<LearnerDatabase>, ExerciseService) {
        let db = Arc::new(LearnerDatabase::new_in_memory().unwrap());
        let caps = Capabilities::new(Arc::new(ConstantEmbedder), translator, generator, Duration::from_secs(1));
        let context = ContextStore::new(Arc::clone(&db), caps.clone(), retrieval);
        (db, ExerciseService::new(caps, context))
    }

    fn enabled() -> RetrievalConfig {
        RetrievalConfig {
            enabled: true,
            ..RetrievalConfig::default()
        }
    }

    #[test]
    fn state_transitions() {
        use GenerationState::*;
        assert!(Requested.can_advance_to(Generated));
        assert!(Validated.can_advance_to(Repaired));
        assert!(Repaired.can_advance_to(Validated));
        assert!(Validated.can_advance_to(Delivered));
        assert!(!Requested.can_advance_to(Delivered));
        assert!(!Repaired.can_advance_to(Delivered));
        assert!(!Delivered.can_advance_to(Generated));
    }

    #[tokio::test]
    async fn clean_generation_is_delivered_once() {
        let generator = ScriptedGenerator::with_exercises(vec![good_exercise()]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let delivered = service
            .vocab_exercise("  kitten ", None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Llm);
        assert_eq!(delivered.word, "kitten");
        assert_eq!(delivered.exercise, good_exercise());
        assert!(!delivered.phonics.is_empty());
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn one_low_quality_response_is_regenerated() {
        let generator = ScriptedGenerator::with_exercises(vec![templated_exercise(), good_exercise()]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let delivered = service
            .vocab_exercise("kitten", None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Llm);
        assert_eq!(delivered.exercise.definition, "a baby cat");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn second_low_quality_response_is_a_validation_error() {
        let generator = ScriptedGenerator::with_exercises(vec![
            templated_exercise(),
            templated_exercise(),
            good_exercise(),
        ]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let prompt = ExercisePrompt {
            word: "kitten".to_string(),
            context: Vec::new(),
            options: ExerciseOptions::default(),
        };
        let err = service.generate_validated_exercise(&prompt).await.unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
        assert!(err.to_string().contains("definition is templated"));
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn repeated_low_quality_delivers_the_fallback() {
        let generator = ScriptedGenerator::with_exercises(vec![templated_exercise(), templated_exercise()]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let delivered = service
            .vocab_exercise("kitten", None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Fallback);
        assert_eq!(delivered.exercise, fallback_exercise("kitten", &ExerciseOptions::default()));
        assert!(!delivered.exercise.definition.contains("word to learn"));
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn offline_capabilities_deliver_the_fallback() {
        let offline = Arc::new(OfflineProvider);
        let (_db, service) = service(offline.clone(), offline, RetrievalConfig::default());
        let options = ExerciseOptions {
            direction: Some(LearningDirection::EnToZh),
            style: OutputStyle::Immersion,
        };

        let delivered = service.vocab_exercise("happy", None, options).await.unwrap();
        assert_eq!(delivered.source, ContentSource::Fallback);
        assert_eq!(delivered.exercise.definition, "感到开心和快乐。");
    }

    #[tokio::test]
    async fn invalid_word_never_reaches_the_generator() {
        let generator = ScriptedGenerator::with_exercises(vec![good_exercise()]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let err = service
            .vocab_exercise("kitten123", None, ExerciseOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn bilingual_delivery_carries_both_languages() {
        let generator = ScriptedGenerator::with_exercises(vec![good_exercise()]);
        let (_db, service) = service(generator, Arc::new(TaggingTranslator), RetrievalConfig::default());
        let options = ExerciseOptions {
            direction: Some(LearningDirection::EnToZh),
            style: OutputStyle::Bilingual,
        };

        let delivered = service.vocab_exercise("kitten", None, options).await.unwrap();
        assert_eq!(delivered.source, ContentSource::Llm);
        assert_eq!(delivered.exercise.definition, "a baby cat\n中文：a baby cat");
        assert_eq!(
            delivered.exercise.example_sentence,
            "The kitten naps in a box.\n中文：The kitten naps in a box."
        );
    }

    #[tokio::test]
    async fn delivered_exercises_are_archived_and_feed_later_prompts() {
        let generator = ScriptedGenerator::with_exercises(vec![good_exercise(), good_exercise()]);
        let (db, service) = service(generator.clone(), Arc::new(FailingTranslator), enabled());
        let learner = db.learners.get_or_create("Ana").unwrap().id;

        service
            .vocab_exercise("kitten", Some(learner), ExerciseOptions::default())
            .await
            .unwrap();
        let docs = db.documents.list_by_type("vocab_exercise", 10).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.starts_with("Word: kitten\nDefinition: a baby cat\n"));
        assert_eq!(docs[0].learner_id, Some(learner));
        let metadata = docs[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["source"], "llm");
        assert_eq!(metadata["word"], "kitten");

        service
            .vocab_exercise("kitten", Some(learner), ExerciseOptions::default())
            .await
            .unwrap();
        let contexts = generator.contexts.lock().unwrap();
        assert!(contexts[0].is_empty());
        assert_eq!(contexts[1].len(), 1);
        assert!(contexts[1][0].starts_with("Word: kitten"));
    }

    #[tokio::test]
    async fn offline_story_is_the_fallback() {
        let offline = Arc::new(OfflineProvider);
        let (db, service) = service(offline.clone(), offline, enabled());

        let delivered = service
            .comprehension_exercise(StoryLevel::Beginner, Some("  "), None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Fallback);
        assert_eq!(delivered.exercise.level, StoryLevel::Beginner);
        assert_eq!(delivered.exercise.blocks.len(), 4);
        assert_eq!(delivered.exercise.questions.len(), 3);

        let docs = db.documents.list_by_type("comprehension_story", 10).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.contains("Questions:\n- "));
        let metadata = docs[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["level"], "beginner");
        assert!(metadata["theme"].is_null());
        assert_eq!(metadata["source"], "fallback");
    }

    fn blank_question_story() -> GeneratedStory {
        let mut story = fallback_story(&ExerciseOptions::default());
        story.title = "Ducks at the Lake".to_string();
        for question in &mut story.questions {
            question.question = "   ".to_string();
        }
        story
    }

    #[tokio::test]
    async fn one_bad_story_is_regenerated() {
        let mut good = fallback_story(&ExerciseOptions::default());
        good.title = "Ducks at the Lake".to_string();
        let generator = ScriptedGenerator::with_stories(vec![blank_question_story(), good]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let delivered = service
            .comprehension_exercise(StoryLevel::Beginner, Some("ducks"), None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Llm);
        assert_eq!(delivered.exercise.title, "Ducks at the Lake");
        assert!(delivered.exercise.questions.iter().all(|q| !q.question.trim().is_empty()));
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn second_bad_story_is_a_validation_error() {
        let generator = ScriptedGenerator::with_stories(vec![blank_question_story(), blank_question_story()]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());
        let prompt = StoryPrompt {
            theme: Some("ducks".to_string()),
            level: StoryLevel::Beginner,
            context: Vec::new(),
            options: ExerciseOptions::default(),
        };
        let fallback = fallback_story(&ExerciseOptions::default());

        let err = service.generate_validated_story(&prompt, &fallback).await.unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
        assert!(err.to_string().contains("question is empty"));
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn repeated_bad_stories_deliver_the_fallback() {
        let generator = ScriptedGenerator::with_stories(vec![blank_question_story(), blank_question_story()]);
        let (db, service) = service(generator.clone(), Arc::new(FailingTranslator), enabled());

        let delivered = service
            .comprehension_exercise(StoryLevel::Beginner, Some("ducks"), None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Fallback);
        assert_eq!(delivered.exercise.title, "The Brave Turtle");
        assert_eq!(delivered.exercise.questions.len(), 3);
        assert_eq!(generator.calls(), 2);

        let docs = db.documents.list_by_type("comprehension_story", 10).unwrap();
        assert_eq!(docs[0].metadata.as_ref().unwrap()["source"], "fallback");
    }

    #[tokio::test]
    async fn generated_story_is_delivered() {
        let mut story = fallback_story(&ExerciseOptions::default());
        story.title = "Ducks at the Lake".to_string();
        let generator = ScriptedGenerator::with_stories(vec![story]);
        let (_db, service) = service(generator.clone(), Arc::new(FailingTranslator), RetrievalConfig::default());

        let delivered = service
            .comprehension_exercise(StoryLevel::Expert, Some("ducks"), None, ExerciseOptions::default())
            .await
            .unwrap();
        assert_eq!(delivered.source, ContentSource::Llm);
        assert_eq!(delivered.exercise.title, "Ducks at the Lake");
        assert_eq!(delivered.exercise.level, StoryLevel::Expert);
        assert_eq!(generator.calls(), 1);
    }
}
