//! Context engine - archives generated content and answers similarity queries
//! used to bias later generation.
//!
//! Nothing here ever fails the caller: a disabled store, a failed embedding or a
//! storage error all degrade to "no context".

pub mod similarity;

pub use similarity::{cosine_similarity, rank_by_similarity};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capabilities::Capabilities;
use crate::config::RetrievalConfig;
use crate::learner_db::{LearnerDatabase, NewDocument};
use crate::utils::TextUtils;

pub struct ContextStore {
    database: Arc<LearnerDatabase>,
    capabilities: Capabilities,
    config: RetrievalConfig,
}

impl ContextStore {
    pub fn new(database: Arc<LearnerDatabase>, capabilities: Capabilities, config: RetrievalConfig) -> Self {
        Self {
            database,
            capabilities,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Archive `text` with its embedding. `learner_id = None` stores into the
    /// global pool. Text is trimmed and cut to `max_chars` characters.
    pub async fn store(&self, text: &str, doc_type: &str, learner_id: Option<i64>, metadata: Option<&Value>) {
        if !self.config.enabled {
            return;
        }
        let doc_type = doc_type.trim();
        let text = TextUtils::truncate_chars(text, self.config.max_chars);
        if text.is_empty() || doc_type.is_empty() {
            debug!("Skipping context store: empty text or document type");
            return;
        }

        let embedding = match self.capabilities.embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Context store skipped, embedding failed: {}", e);
                return;
            }
        };

        let document = NewDocument {
            learner_id,
            doc_type,
            text,
            metadata,
            embedding: &embedding,
            embedding_model: self.capabilities.embedding_model(),
        };
        if let Err(e) = self.database.documents.insert(&document) {
            warn!("Context store skipped, storage failed: {}", e);
        }
    }

    /// Texts of up to `top_k` documents most similar to `query`, drawn from the
    /// `max_docs` most recent documents visible to `learner_id`.
    pub async fn retrieve(&self, query: &str, learner_id: Option<i64>, top_k: usize, max_docs: usize) -> Vec<String> {
        if !self.config.enabled {
            return Vec::new();
        }
        let query = query.trim();
        if query.is_empty() || top_k == 0 || max_docs == 0 {
            return Vec::new();
        }

        let query_vector = match self.capabilities.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Context retrieval skipped, embedding failed: {}", e);
                return Vec::new();
            }
        };

        let documents = match self.database.documents.recent_embedded(learner_id, max_docs) {
            Ok(documents) => documents,
            Err(e) => {
                warn!("Context retrieval skipped, storage failed: {}", e);
                return Vec::new();
            }
        };

        let results = rank_by_similarity(&query_vector, &documents, top_k);
        debug!(
            "Retrieved {} of {} candidate documents for {:?}",
            results.len(),
            documents.len(),
            query
        );
        results
    }

    /// `retrieve` with the configured `top_k` and `max_docs`.
    pub async fn context_for(&self, query: &str, learner_id: Option<i64>) -> Vec<String> {
        self.retrieve(query, learner_id, self.config.top_k, self.config.max_docs)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{Embedder, OfflineProvider};
    use crate::error::{Result, TutorError};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Two-dimensional embedding: animal words point one way, vehicles the other.
    struct TopicEmbedder;

    #[async_trait]
    impl Embedder for TopicEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            if lower.contains("fail") {
                return Err(TutorError::unavailable("embedding", "forced failure"));
            }
            let animal = ["cat", "dog", "turtle"].iter().filter(|w| lower.contains(*w)).count() as f32;
            let vehicle = ["car", "bus", "train"].iter().filter(|w| lower.contains(*w)).count() as f32;
            Ok(vec![animal, vehicle])
        }

        fn model_name(&self) -> &str {
            "topic"
        }
    }

    fn enabled() -> RetrievalConfig {
        RetrievalConfig {
            enabled: true,
            ..RetrievalConfig::default()
        }
    }

    fn store_with(config: RetrievalConfig) -> (Arc<LearnerDatabase>, ContextStore) {
        let db = Arc::new(LearnerDatabase::new_in_memory().unwrap());
        let offline = Arc::new(OfflineProvider);
        let caps = Capabilities::new(Arc::new(TopicEmbedder), offline.clone(), offline, Duration::from_secs(1));
        let store = ContextStore::new(Arc::clone(&db), caps, config);
        (db, store)
    }

    #[tokio::test]
    async fn disabled_store_is_a_no_op() {
        let (db, store) = store_with(RetrievalConfig::default());
        store.store("the cat naps", "vocab_exercise", None, None).await;
        assert_eq!(db.get_stats().unwrap().total_documents, 0);
        assert!(store.retrieve("cat", None, 3, 200).await.is_empty());
    }

    #[tokio::test]
    async fn empty_inputs_are_skipped() {
        let (db, store) = store_with(enabled());
        store.store("   ", "vocab_exercise", None, None).await;
        store.store("the cat naps", "  ", None, None).await;
        assert_eq!(db.get_stats().unwrap().total_documents, 0);
        assert!(store.retrieve("  ", None, 3, 200).await.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_stores_nothing() {
        let (db, store) = store_with(enabled());
        store.store("this will fail", "vocab_exercise", None, None).await;
        assert_eq!(db.get_stats().unwrap().total_documents, 0);
        assert!(store.retrieve("fail", None, 3, 200).await.is_empty());
    }

    #[tokio::test]
    async fn text_is_truncated_to_max_chars() {
        let (db, store) = store_with(RetrievalConfig {
            max_chars: 10,
            ..enabled()
        });
        store.store("  the cat sat on the mat  ", "vocab_exercise", None, None).await;
        let docs = db.documents.list_by_type("vocab_exercise", 10).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "the cat sa");
        db.documents.verify_integrity().unwrap();
    }

    #[tokio::test]
    async fn retrieval_ranks_similar_documents_first() {
        let (_db, store) = store_with(enabled());
        store.store("a dog plays", "vocab_exercise", None, None).await;
        store.store("the red car", "vocab_exercise", None, None).await;
        store.store("the cat and the dog", "vocab_exercise", None, None).await;

        let results = store.retrieve("cat", None, 3, 200).await;
        assert_eq!(results, vec!["the cat and the dog", "a dog plays"]);

        let results = store.retrieve("bus", None, 3, 200).await;
        assert_eq!(results, vec!["the red car"]);
    }

    #[tokio::test]
    async fn retrieval_respects_learner_visibility() {
        let (db, store) = store_with(enabled());
        let ana = db.learners.get_or_create("Ana").unwrap().id;
        let ben = db.learners.get_or_create("Ben").unwrap().id;
        store.store("ana's cat story", "comprehension_story", Some(ana), None).await;
        store.store("shared dog story", "comprehension_story", None, None).await;

        let for_ben = store.retrieve("cat", Some(ben), 3, 200).await;
        assert_eq!(for_ben, vec!["shared dog story"]);

        let for_ana = store.context_for("cat", Some(ana)).await;
        assert_eq!(for_ana.len(), 2);
    }

    #[tokio::test]
    async fn max_docs_bounds_the_scan() {
        let (_db, store) = store_with(enabled());
        store.store("old cat", "vocab_exercise", None, None).await;
        store.store("new car", "vocab_exercise", None, None).await;
        assert!(store.retrieve("cat", None, 3, 1).await.is_empty());
    }
}
