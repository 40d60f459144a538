use std::collections::HashSet;

use crate::learner_db::WordAggregate;
use crate::recommendation::RecommendationPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    OverPracticed,
    Weak,
    /// Attempted, neither promoted nor suppressed. Not emitted.
    Adequate,
}

/// Rank words for practice.
///
/// `aggregates` must be in a deterministic traversal order (the ledger returns
/// first-attempt order); weak words with equal averages keep that order.
/// Unattempted candidates follow in input order, duplicates emitted once.
/// Over-practiced words are removed from the final list wherever they came from.
pub fn rank_words<S: AsRef<str>>(
    policy: &RecommendationPolicy,
    aggregates: &[WordAggregate],
    candidates: &[S],
    limit: usize,
) -> Vec<String> {
    let mut over_practiced: HashSet<&str> = HashSet::new();
    let mut weak: Vec<&WordAggregate> = Vec::new();

    for aggregate in aggregates {
        match policy.classify(aggregate) {
            WordClass::OverPracticed => {
                over_practiced.insert(aggregate.word.as_str());
            }
            WordClass::Weak => weak.push(aggregate),
            WordClass::Adequate => {}
        }
    }

    // sort_by is stable
    weak.sort_by(|a, b| a.avg_score.total_cmp(&b.avg_score));

    let attempted: HashSet<&str> = aggregates.iter().map(|a| a.word.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    weak.iter()
        .map(|a| a.word.as_str())
        .chain(
            candidates
                .iter()
                .map(|c| c.as_ref())
                .filter(|word| !attempted.contains(word)),
        )
        .filter(|word| !over_practiced.contains(word))
        .filter(|word| seen.insert(*word))
        .take(limit)
        .map(str::to_string)
        .collect()
}
