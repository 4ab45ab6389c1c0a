//! Retrieval service: tokenize, score, rank, top-k select. One instance is
//! shared process-wide; after construction it is read-only and safe to use
//! from concurrent requests without locking.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use deskqa_core::types::ScoredChunk;

use crate::index::CorpusIndex;
use crate::score::{bm25_scores, cosine, fuse, min_max_normalize};
use crate::tokenize::tokenize;

pub const DEFAULT_ALPHA: f64 = 0.65;

static SHARED: OnceLock<Arc<RetrievalService>> = OnceLock::new();

pub struct RetrievalService {
    index: CorpusIndex,
    alpha: f64,
}

impl RetrievalService {
    pub fn new(index: CorpusIndex, alpha: f64) -> Self {
        Self { index, alpha: alpha.clamp(0.0, 1.0) }
    }

    /// The process-wide shared instance. The first caller's arguments win;
    /// concurrent first callers block until the one construction finishes.
    /// Construction never fails: an unavailable corpus yields an empty
    /// index that answers every query with no results.
    pub fn shared(corpus_path: &Path, alpha: f64) -> Arc<RetrievalService> {
        Arc::clone(SHARED.get_or_init(|| {
            Arc::new(Self::new(CorpusIndex::load(corpus_path), alpha))
        }))
    }

    /// Top-k chunks by descending hybrid score. Ties break by corpus
    /// insertion order (first seen wins), so identical inputs always
    /// produce identical output. Empty corpus or `k == 0` yield nothing.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        if self.index.is_empty() || k == 0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let bm25_n = min_max_normalize(&bm25_scores(&self.index, &query_tokens));
        let q_vec = self.index.query_vector(query);
        let tfidf_raw: Vec<f64> = self
            .index
            .tfidf
            .iter()
            .map(|doc_vec| cosine(&q_vec, doc_vec))
            .collect();
        let tfidf_n = min_max_normalize(&tfidf_raw);
        let hybrid = fuse(self.alpha, &bm25_n, &tfidf_n);

        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by(|&a, &b| {
            hybrid[b]
                .partial_cmp(&hybrid[a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        order.truncate(k);

        debug!(k, results = order.len(), "search \"{query}\"");
        order
            .into_iter()
            .map(|i| ScoredChunk {
                chunk: self.index.chunks()[i].clone(),
                bm25: bm25_n[i],
                tfidf: tfidf_n[i],
                hybrid: hybrid[i],
            })
            .collect()
    }
}
