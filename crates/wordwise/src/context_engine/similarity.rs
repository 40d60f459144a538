use rayon::prelude::*;

use crate::learner_db::EmbeddedDocument;

/// Cosine similarity accumulated in f64. Empty, mismatched, zero-norm or
/// non-finite input scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Texts of the `top_k` documents scoring above zero, best first. `documents`
/// arrive newest first and the sort is stable, so equal scores keep recency order.
pub fn rank_by_similarity(query: &[f32], documents: &[EmbeddedDocument], top_k: usize) -> Vec<String> {
    let scores: Vec<f64> = documents
        .par_iter()
        .map(|doc| cosine_similarity(query, &doc.vector))
        .collect();

    let mut scored: Vec<(f64, &EmbeddedDocument)> = scores
        .into_iter()
        .zip(documents.iter())
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .take(top_k)
        .map(|(_, doc)| doc.text.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc(doc_id: i64, text: &str, vector: Vec<f32>) -> EmbeddedDocument {
        EmbeddedDocument {
            doc_id,
            text: text.to_string(),
            vector,
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn ranking_drops_non_positive_and_keeps_recency_on_ties() {
        let docs = vec![
            doc(4, "newest match", vec![1.0, 0.0]),
            doc(3, "opposite", vec![-1.0, 0.0]),
            doc(2, "orthogonal", vec![0.0, 1.0]),
            doc(1, "older match", vec![2.0, 0.0]),
            doc(0, "partial", vec![1.0, 1.0]),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], &docs, 10);
        assert_eq!(ranked, vec!["newest match", "older match", "partial"]);

        let top_one = rank_by_similarity(&[1.0, 0.0], &docs, 1);
        assert_eq!(top_one, vec!["newest match"]);
    }

    proptest! {
        #[test]
        fn similarity_is_bounded_and_symmetric(
            a in prop::collection::vec(-100.0f32..100.0, 1..16),
            b in prop::collection::vec(-100.0f32..100.0, 1..16),
        ) {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert!(ab.is_finite());
            prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&ab));
            prop_assert!((ab - ba).abs() < 1e-9);
        }
    }
}
