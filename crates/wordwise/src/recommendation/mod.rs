//! Recommendation Classifier - picks the next words to practice from the exercise ledger

pub mod classifier;

pub use classifier::{rank_words, WordClass};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::learner_db::{ExerciseLedger, WordAggregate};

/// Thresholds that partition attempted words.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    /// At or above this many attempts a word is suppressed regardless of score.
    pub over_practice_attempts: u32,
    /// Average score strictly below this marks a word as weak...
    pub weak_score_below: f64,
    /// ...while it has strictly fewer attempts than this.
    pub weak_attempts_below: u32,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            over_practice_attempts: 5,
            weak_score_below: 70.0,
            weak_attempts_below: 3,
        }
    }
}

impl RecommendationPolicy {
    pub fn classify(&self, aggregate: &WordAggregate) -> WordClass {
        if aggregate.attempts >= self.over_practice_attempts {
            WordClass::OverPracticed
        } else if aggregate.avg_score < self.weak_score_below
            && aggregate.attempts < self.weak_attempts_below
        {
            WordClass::Weak
        } else {
            WordClass::Adequate
        }
    }
}

/// Ledger-backed front end for [`rank_words`].
pub struct Recommender<'a> {
    ledger: &'a ExerciseLedger,
    policy: RecommendationPolicy,
}

impl<'a> Recommender<'a> {
    pub fn new(ledger: &'a ExerciseLedger, policy: RecommendationPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Weak words (worst average first), then unattempted candidates in input order.
    pub fn recommend<S: AsRef<str>>(
        &self,
        learner_id: i64,
        candidates: &[S],
        limit: usize,
    ) -> Result<Vec<String>> {
        let aggregates = self.ledger.word_aggregates(learner_id)?;
        let words = rank_words(&self.policy, &aggregates, candidates, limit);
        debug!(
            "Recommended {} of {} candidates for learner {} ({} words attempted)",
            words.len(),
            candidates.len(),
            learner_id,
            aggregates.len()
        );
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner_db::{ExerciseKind, LearnerDatabase};

    fn aggregate(word: &str, attempts: u32, avg_score: f64) -> WordAggregate {
        WordAggregate {
            word: word.to_string(),
            attempts,
            avg_score,
            min_score: avg_score as u8,
        }
    }

    #[test]
    fn classify_boundaries() {
        let policy = RecommendationPolicy::default();
        assert_eq!(policy.classify(&aggregate("a", 5, 10.0)), WordClass::OverPracticed);
        assert_eq!(policy.classify(&aggregate("a", 2, 69.9)), WordClass::Weak);
        assert_eq!(policy.classify(&aggregate("a", 2, 70.0)), WordClass::Adequate);
        assert_eq!(policy.classify(&aggregate("a", 3, 10.0)), WordClass::Adequate);
        assert_eq!(policy.classify(&aggregate("a", 4, 99.0)), WordClass::Adequate);
    }

    #[test]
    fn custom_policy_changes_partition() {
        let strict = RecommendationPolicy {
            over_practice_attempts: 3,
            weak_score_below: 90.0,
            weak_attempts_below: 3,
        };
        assert_eq!(strict.classify(&aggregate("a", 3, 10.0)), WordClass::OverPracticed);
        assert_eq!(strict.classify(&aggregate("a", 1, 85.0)), WordClass::Weak);
    }

    #[test]
    fn ana_scenario_through_the_ledger() {
        let db = LearnerDatabase::new_in_memory().unwrap();
        let ana = db.learners.get_or_create("Ana").unwrap().id;
        for score in [40, 50, 60] {
            db.ledger.record(ana, "cat", ExerciseKind::Quiz, score, false).unwrap();
        }
        for score in [20, 30] {
            db.ledger.record(ana, "dog", ExerciseKind::Quiz, score, false).unwrap();
        }

        let recommender = Recommender::new(&db.ledger, RecommendationPolicy::default());
        let words = recommender.recommend(ana, &["cat", "dog", "fox"], 2).unwrap();
        assert_eq!(words, vec!["dog", "fox"]);
    }

    #[test]
    fn over_practiced_word_never_recommended() {
        let db = LearnerDatabase::new_in_memory().unwrap();
        let ana = db.learners.get_or_create("Ana").unwrap().id;
        for score in [0, 10, 20, 30, 40] {
            db.ledger.record(ana, "fox", ExerciseKind::Pronunciation, score, false).unwrap();
        }

        let recommender = Recommender::new(&db.ledger, RecommendationPolicy::default());
        let words = recommender.recommend(ana, &["fox", "cat", "fox"], 10).unwrap();
        assert_eq!(words, vec!["cat"]);
    }

    #[test]
    fn learner_without_history_gets_candidates_prefix() {
        let db = LearnerDatabase::new_in_memory().unwrap();
        let ben = db.learners.get_or_create("Ben").unwrap().id;
        let recommender = Recommender::new(&db.ledger, RecommendationPolicy::default());
        let words = recommender
            .recommend(ben, &["sun".to_string(), "moon".to_string(), "star".to_string()], 2)
            .unwrap();
        assert_eq!(words, vec!["sun", "moon"]);
    }
}
