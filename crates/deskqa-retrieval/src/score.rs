//! The two relevance signals and their fusion.
//!
//! BM25 and TF-IDF cosine are computed independently per chunk, min-max
//! normalized to [0, 1], then combined as
//! `hybrid = alpha * bm25 + (1 - alpha) * tfidf`.

use crate::index::{CorpusIndex, SparseVec};

/// BM25 term-frequency saturation.
pub const BM25_K1: f64 = 1.5;
/// BM25 length normalization.
pub const BM25_B: f64 = 0.75;

/// Below this spread the score distribution is considered flat.
const FLAT_EPS: f64 = 1e-9;

/// Okapi BM25 score of every chunk for the given query tokens.
/// Empty corpus yields an empty vector.
pub fn bm25_scores(index: &CorpusIndex, query_tokens: &[String]) -> Vec<f64> {
    let n = index.len();
    let mut scores = vec![0.0; n];
    if n == 0 || query_tokens.is_empty() {
        return scores;
    }
    for (i, score) in scores.iter_mut().enumerate() {
        let len_ratio = index.doc_lens[i] as f64 / index.avg_len.max(1e-12);
        let denom_base = BM25_K1 * (1.0 - BM25_B + BM25_B * len_ratio);
        for term in query_tokens {
            let Some(&idf) = index.bm25_idf.get(term) else { continue };
            let tf = f64::from(*index.term_counts[i].get(term).unwrap_or(&0));
            if tf > 0.0 {
                *score += idf * (tf * (BM25_K1 + 1.0)) / (tf + denom_base);
            }
        }
    }
    scores
}

/// Cosine similarity as a sparse dot product. Both inputs are already
/// L2-normalized; iterates over the smaller term set.
pub fn cosine(a: &SparseVec, b: &SparseVec) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|bw| w * bw))
        .sum()
}

/// Min-max normalize into [0, 1]. A flat distribution (including all-zero)
/// maps to all zeros so equal scores never rank arbitrary chunks first.
pub fn min_max_normalize(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mn = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let mx = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if mx - mn < FLAT_EPS {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| (s - mn) / (mx - mn)).collect()
}

/// Weighted fusion of the two normalized signals.
pub fn fuse(alpha: f64, bm25_n: &[f64], tfidf_n: &[f64]) -> Vec<f64> {
    bm25_n
        .iter()
        .zip(tfidf_n)
        .map(|(b, t)| alpha * b + (1.0 - alpha) * t)
        .collect()
}
