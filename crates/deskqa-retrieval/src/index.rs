//! In-memory corpus index: the ordered chunk sequence plus every statistic
//! the hybrid scorer needs. Built eagerly in one shot; rebuilding is a
//! whole-corpus operation and the index is read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use deskqa_core::ingest::load_corpus;
use deskqa_core::types::Chunk;

use crate::tokenize::tokenize;

/// Sparse term-weight vector keyed by term.
pub type SparseVec = HashMap<String, f64>;

/// Fraction of the mean Robertson IDF used as the floor for terms whose
/// raw IDF goes negative (terms in more than half the corpus).
const BM25_IDF_EPSILON: f64 = 0.25;

pub struct CorpusIndex {
    chunks: Vec<Chunk>,
    pub(crate) term_counts: Vec<HashMap<String, u32>>,
    pub(crate) doc_lens: Vec<usize>,
    pub(crate) avg_len: f64,
    /// Smoothed IDF, `ln((N+1)/(df+1)) + 1`, strictly positive for every
    /// vocabulary term. Drives the TF-IDF cosine signal.
    idf: HashMap<String, f64>,
    /// Robertson IDF with a small positive floor. Drives the BM25 signal.
    pub(crate) bm25_idf: HashMap<String, f64>,
    /// Per-chunk L2-normalized TF-IDF vectors.
    pub(crate) tfidf: Vec<SparseVec>,
}

impl CorpusIndex {
    /// Build every statistic from the ordered chunk sequence.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();
        let doc_lens: Vec<usize> = tokenized.iter().map(Vec::len).collect();
        let total: usize = doc_lens.iter().sum();
        let avg_len = if tokenized.is_empty() {
            0.0
        } else {
            total as f64 / tokenized.len() as f64
        };

        let term_counts: Vec<HashMap<String, u32>> = tokenized
            .iter()
            .map(|toks| {
                let mut counts: HashMap<String, u32> = HashMap::new();
                for t in toks {
                    *counts.entry(t.clone()).or_default() += 1;
                }
                counts
            })
            .collect();

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for counts in &term_counts {
            for term in counts.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
        }

        let n_docs = tokenized.len().max(1) as f64;
        let idf: HashMap<String, f64> = doc_freq
            .iter()
            .map(|(term, &df)| {
                (term.clone(), ((n_docs + 1.0) / (df as f64 + 1.0)).ln() + 1.0)
            })
            .collect();
        let bm25_idf = robertson_idf(&doc_freq, n_docs);

        let tfidf = term_counts
            .iter()
            .zip(&doc_lens)
            .map(|(counts, &len)| weighted_vector(counts, len, &idf))
            .collect();

        Self { chunks, term_counts, doc_lens, avg_len, idf, bm25_idf, tfidf }
    }

    /// Load from a JSONL corpus file. A missing or unreadable file is not
    /// an error: the index comes up empty and every query returns nothing.
    pub fn load(corpus_path: &Path) -> Self {
        let chunks = match load_corpus(corpus_path) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("corpus unavailable at {}: {e:#}", corpus_path.display());
                Vec::new()
            }
        };
        Self::from_chunks(chunks)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// TF-IDF vector for a query, using the corpus IDF table. Terms outside
    /// the vocabulary contribute nothing.
    pub fn query_vector(&self, query: &str) -> SparseVec {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return SparseVec::new();
        }
        let mut counts: HashMap<String, u32> = HashMap::new();
        for t in &tokens {
            *counts.entry(t.clone()).or_default() += 1;
        }
        weighted_vector(&counts, tokens.len(), &self.idf)
    }
}

/// `(freq/len) * idf` per term, then L2-normalized. A zero norm is treated
/// as 1 so the all-out-of-vocabulary case stays a zero vector.
fn weighted_vector(counts: &HashMap<String, u32>, len: usize, idf: &HashMap<String, f64>) -> SparseVec {
    let mut vec = SparseVec::new();
    if len == 0 {
        return vec;
    }
    for (term, &freq) in counts {
        if let Some(&w) = idf.get(term) {
            vec.insert(term.clone(), (f64::from(freq) / len as f64) * w);
        }
    }
    let norm = vec.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for v in vec.values_mut() {
        *v /= norm;
    }
    vec
}

/// Okapi IDF `ln((N - df + 0.5)/(df + 0.5))`. Terms appearing in more than
/// half the corpus would go negative; they get floored at a fraction of the
/// mean IDF instead so frequent terms keep a small positive weight.
fn robertson_idf(doc_freq: &HashMap<String, usize>, n_docs: f64) -> HashMap<String, f64> {
    let mut idf: HashMap<String, f64> = HashMap::new();
    let mut sum = 0.0;
    let mut negatives: Vec<String> = Vec::new();
    for (term, &df) in doc_freq {
        let df = df as f64;
        let value = ((n_docs - df + 0.5) / (df + 0.5)).ln();
        sum += value;
        if value < 0.0 {
            negatives.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }
    if !idf.is_empty() {
        let floor = BM25_IDF_EPSILON * (sum / idf.len() as f64).abs();
        for term in negatives {
            idf.insert(term, floor);
        }
    }
    idf
}
