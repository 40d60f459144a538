//! OpenAI-compatible hosted provider.
//!
//! Chat completions back generation and translation; `/v1/embeddings` backs the
//! embedder. Transport errors, non-success statuses and unusable payloads are all
//! reported as the capability being unavailable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::payload;
use crate::capabilities::prompts;
use crate::capabilities::{ContentGenerator, Embedder, ExercisePrompt, Language, StoryPrompt, Translator};
use crate::config::ProviderConfig;
use crate::error::{Result, TutorError};
use crate::exercise::{GeneratedStory, VocabExercise};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: String) -> Self {
        Self {
            role: "system".to_string(),
            content,
        }
    }

    fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Sampling settings for one kind of chat call.
struct ChatSettings {
    max_tokens: u32,
    temperature: f32,
    json: bool,
}

const EXERCISE_SETTINGS: ChatSettings = ChatSettings {
    max_tokens: 300,
    temperature: 0.7,
    json: true,
};

const STORY_SETTINGS: ChatSettings = ChatSettings {
    max_tokens: 1000,
    temperature: 0.8,
    json: true,
};

const TRANSLATION_SETTINGS: ChatSettings = ChatSettings {
    max_tokens: 300,
    temperature: 0.2,
    json: false,
};

const SENTENCE_SETTINGS: ChatSettings = ChatSettings {
    max_tokens: 120,
    temperature: 0.7,
    json: false,
};

pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    text_model: String,
    embedding_model: String,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig, api_key: &str) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            text_model: config.text_model.clone(),
            embedding_model: config.embedding_model.clone(),
            http_client: reqwest::Client::builder().build().unwrap_or_default(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    async fn chat(
        &self,
        capability: &'static str,
        system: String,
        user: String,
        settings: &ChatSettings,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.text_model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            response_format: settings.json.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TutorError::unavailable(capability, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Provider returned {} for {} call", status, capability);
            return Err(TutorError::unavailable(
                capability,
                format!("provider returned {}: {}", status, body),
            ));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TutorError::unavailable(capability, format!("unreadable response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(TutorError::unavailable(capability, "empty completion"));
        }
        debug!("{} call returned {} chars", capability, content.len());
        Ok(content)
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response = self
            .http_client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TutorError::unavailable("embedding", format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TutorError::unavailable(
                "embedding",
                format!("provider returned {}: {}", status, body),
            ));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| TutorError::unavailable("embedding", format!("unreadable response: {}", e)))?;

        match parsed.data.into_iter().next() {
            Some(data) if !data.embedding.is_empty() => Ok(data.embedding),
            _ => Err(TutorError::unavailable("embedding", "empty embedding")),
        }
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl Translator for OpenAiProvider {
    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        let system = "You are a careful translator for a children's vocabulary app.".to_string();
        let content = self
            .chat(
                "translation",
                system,
                prompts::translation_prompt(text, target),
                &TRANSLATION_SETTINGS,
            )
            .await?;
        Ok(content.trim_matches('"').trim().to_string())
    }
}

#[async_trait]
impl ContentGenerator for OpenAiProvider {
    async fn generate_exercise(&self, prompt: &ExercisePrompt) -> Result<VocabExercise> {
        let raw = self
            .chat(
                "generation",
                prompts::exercise_system_prompt(&prompt.options),
                prompts::exercise_task_prompt(prompt),
                &EXERCISE_SETTINGS,
            )
            .await?;
        payload::parse_exercise(&raw)
    }

    async fn generate_story(&self, prompt: &StoryPrompt) -> Result<GeneratedStory> {
        let raw = self
            .chat(
                "generation",
                prompts::story_system_prompt(&prompt.options),
                prompts::story_task_prompt(prompt),
                &STORY_SETTINGS,
            )
            .await?;
        payload::parse_story(&raw)
    }

    async fn generate_example_sentence(&self, word: &str, definition: &str) -> Result<String> {
        let system = "You write short, child-safe example sentences.".to_string();
        let content = self
            .chat(
                "generation",
                system,
                prompts::example_sentence_prompt(word, definition),
                &SENTENCE_SETTINGS,
            )
            .await?;
        Ok(content.trim_matches('"').trim().to_string())
    }
}
