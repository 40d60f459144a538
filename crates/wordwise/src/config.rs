// wordwise/crates/wordwise/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::recommendation::RecommendationPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub retrieval: RetrievalConfig,
    pub policy: RecommendationPolicy,
    pub provider: ProviderConfig,
    pub capability_timeout_seconds: u64,
}

/// Context Store switches. Disabled means `store`/`retrieve` do nothing.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub top_k: usize,
    pub max_docs: usize,
    pub max_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: 3,
            max_docs: 200,
            max_chars: 1200,
        }
    }
}

/// OpenAI-compatible provider settings. No API key means the offline provider is used.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub embedding_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/progress.db"),
            retrieval: RetrievalConfig::default(),
            policy: RecommendationPolicy::default(),
            provider: ProviderConfig::default(),
            capability_timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let defaults = Config::default();

        let database_path = env::var("WORDWISE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let retrieval = RetrievalConfig {
            enabled: env::var("WORDWISE_RAG_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.retrieval.enabled),
            top_k: env_or("WORDWISE_RAG_TOP_K", defaults.retrieval.top_k)?,
            max_docs: env_or("WORDWISE_RAG_MAX_DOCS", defaults.retrieval.max_docs)?,
            max_chars: env_or("WORDWISE_RAG_MAX_CHARS", defaults.retrieval.max_chars)?,
        };

        let policy = RecommendationPolicy {
            over_practice_attempts: env_or(
                "WORDWISE_OVER_PRACTICE_ATTEMPTS",
                defaults.policy.over_practice_attempts,
            )?,
            weak_score_below: env_or("WORDWISE_WEAK_SCORE_BELOW", defaults.policy.weak_score_below)?,
            weak_attempts_below: env_or(
                "WORDWISE_WEAK_ATTEMPTS_BELOW",
                defaults.policy.weak_attempts_below,
            )?,
        };

        let provider = ProviderConfig {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.provider.base_url),
            text_model: env::var("OPENAI_TEXT_MODEL").unwrap_or(defaults.provider.text_model),
            embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or(defaults.provider.embedding_model),
        };

        if provider.api_key.is_none() {
            warn!("OPENAI_API_KEY not set; generation will use the local fallback content");
        }

        let config = Self {
            database_path,
            retrieval,
            policy,
            provider,
            capability_timeout_seconds: env_or(
                "WORDWISE_CAPABILITY_TIMEOUT_SECONDS",
                defaults.capability_timeout_seconds,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.capability_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("WORDWISE_CAPABILITY_TIMEOUT_SECONDS must be positive"));
        }
        if self.retrieval.max_chars == 0 {
            return Err(anyhow::anyhow!("WORDWISE_RAG_MAX_CHARS must be positive"));
        }
        if self.policy.weak_attempts_below > self.policy.over_practice_attempts {
            warn!(
                "Weak-attempt ceiling ({}) exceeds the over-practice threshold ({})",
                self.policy.weak_attempts_below, self.policy.over_practice_attempts
            );
        }
        Ok(())
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_seconds)
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- Database Path: {}", self.database_path.display());
        info!("- Retrieval Enabled: {}", self.retrieval.enabled);
        info!(
            "- Retrieval Limits: top_k={}, max_docs={}, max_chars={}",
            self.retrieval.top_k, self.retrieval.max_docs, self.retrieval.max_chars
        );
        info!(
            "- Policy: over-practiced at {} attempts, weak below {} with fewer than {} attempts",
            self.policy.over_practice_attempts,
            self.policy.weak_score_below,
            self.policy.weak_attempts_below
        );
        info!("- Provider: {} ({})", self.provider.base_url, self.provider.text_model);
        info!("- Provider Key Configured: {}", self.provider.api_key.is_some());
        info!("- Capability Timeout: {}s", self.capability_timeout_seconds);
    }
}

/// `1`, `true` and `yes` (any case) enable a flag; everything else disables it.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
