//! External collaborators: embedding, translation and content generation.
//!
//! Every provider call goes through [`Capabilities`], which bounds it with the
//! configured timeout. Providers report every failure as
//! `TutorError::CapabilityUnavailable` so callers can fall back.

pub mod http_provider;
pub mod offline;
pub mod payload;
pub mod prompts;

pub use http_provider::OpenAiProvider;
pub use offline::OfflineProvider;
pub use prompts::{ExercisePrompt, StoryPrompt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, TutorError};
use crate::exercise::{GeneratedStory, VocabExercise};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Chinese => "Simplified Chinese",
        }
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Recorded next to every stored vector.
    fn model_name(&self) -> &str;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: Language) -> Result<String>;
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Payload already validated into a typed exercise.
    async fn generate_exercise(&self, prompt: &ExercisePrompt) -> Result<VocabExercise>;

    async fn generate_story(&self, prompt: &StoryPrompt) -> Result<GeneratedStory>;

    /// One plain English sentence using `word` with the given meaning.
    async fn generate_example_sentence(&self, word: &str, definition: &str) -> Result<String>;
}

/// The provider set handed to the engine, with a shared call timeout.
#[derive(Clone)]
pub struct Capabilities {
    embedder: Arc<dyn Embedder>,
    translator: Arc<dyn Translator>,
    generator: Arc<dyn ContentGenerator>,
    timeout: Duration,
}

impl Capabilities {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        translator: Arc<dyn Translator>,
        generator: Arc<dyn ContentGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            translator,
            generator,
            timeout,
        }
    }

    /// The hosted provider when an API key is configured, otherwise the offline one.
    pub fn from_config(config: &Config) -> Self {
        match config.provider.api_key.as_deref() {
            Some(api_key) => {
                info!("Using hosted provider at {}", config.provider.base_url);
                let provider = Arc::new(OpenAiProvider::new(&config.provider, api_key));
                Self::new(provider.clone(), provider.clone(), provider, config.capability_timeout())
            }
            None => {
                info!("No provider key configured; capabilities are offline");
                let provider = Arc::new(OfflineProvider);
                Self::new(provider.clone(), provider.clone(), provider, config.capability_timeout())
            }
        }
    }

    pub fn offline(timeout: Duration) -> Self {
        let provider = Arc::new(OfflineProvider);
        Self::new(provider.clone(), provider.clone(), provider, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.bounded("embedding", self.embedder.embed(text)).await
    }

    pub async fn translate(&self, text: &str, target: Language) -> Result<String> {
        self.bounded("translation", self.translator.translate(text, target)).await
    }

    pub async fn generate_exercise(&self, prompt: &ExercisePrompt) -> Result<VocabExercise> {
        self.bounded("generation", self.generator.generate_exercise(prompt)).await
    }

    pub async fn generate_story(&self, prompt: &StoryPrompt) -> Result<GeneratedStory> {
        self.bounded("generation", self.generator.generate_story(prompt)).await
    }

    pub async fn generate_example_sentence(&self, word: &str, definition: &str) -> Result<String> {
        self.bounded(
            "generation",
            self.generator.generate_example_sentence(word, definition),
        )
        .await
    }

    async fn bounded<T, F>(&self, capability: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} call timed out after {:?}", capability, self.timeout);
                Err(TutorError::unavailable(
                    capability,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        }
    }
}
