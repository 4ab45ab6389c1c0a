//! Domain types shared by the retrieval engine and the answering agent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type Extra = HashMap<String, String>;

/// A chunk of a source document that is independently indexed.
///
/// - `source`: document identifier (relative path or external id)
/// - `start`/`end`: half-open character offsets into the original document;
///   the sentinel `0:0` marks locations that are not offset-addressable
///   (used by the price tool)
/// - `text`: the text payload of the chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub source: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// Canonical citation tag for this chunk: `source@start:end`.
    pub fn tag(&self) -> String {
        format!("{}@{}:{}", self.source, self.start, self.end)
    }

    /// Offsets are half-open (`end > start`), except the `0:0` sentinel,
    /// and the text payload must be non-empty.
    pub fn validate(&self) -> crate::Result<()> {
        if self.text.is_empty() {
            return Err(crate::Error::EmptyChunk { src: self.source.clone() });
        }
        if self.end <= self.start && !(self.start == 0 && self.end == 0) {
            return Err(crate::Error::ChunkOffsets {
                src: self.source.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// A reference to a piece of evidence backing an answer.
///
/// Must point at a chunk returned by the retrieval call for the same
/// response, or at the price tool's sentinel location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub source: String,
    pub start: usize,
    pub end: usize,
}

impl Citation {
    pub fn for_chunk(chunk: &Chunk) -> Self {
        Self { source: chunk.source.clone(), start: chunk.start, end: chunk.end }
    }

    /// Sentinel citation for a keyed store with no character offsets.
    pub fn sentinel(source: &str) -> Self {
        Self { source: source.to_string(), start: 0, end: 0 }
    }
}

/// A chunk annotated with relevance scores for one query.
///
/// `bm25` and `tfidf` are the two independently min-max normalized
/// signals; `hybrid = alpha * bm25 + (1 - alpha) * tfidf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub bm25: f64,
    pub tfidf: f64,
    pub hybrid: f64,
}

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Route {
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "rag")]
    Rag,
    #[serde(rename = "rag+llm")]
    RagLlm,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Price => write!(f, "price"),
            Route::Rag => write!(f, "rag"),
            Route::RagLlm => write!(f, "rag+llm"),
        }
    }
}

/// Per-request diagnostics returned alongside the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub latency_ms: f64,
    pub retrieved_k: usize,
    pub route: Route,
    pub extra: Extra,
}

/// The final structured response for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub sources: Vec<String>,
    pub metrics: Metrics,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub bytes_read: usize,
    pub sources: Vec<String>,
}
