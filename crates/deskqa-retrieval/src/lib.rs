//! deskqa-retrieval
//!
//! Hybrid lexical retrieval: an in-memory corpus index (BM25 term
//! statistics + L2-normalized TF-IDF sparse vectors) scored by two
//! independent signals that are min-max normalized and fused with a
//! configurable weight.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod index;
pub mod score;
pub mod service;
pub mod tokenize;

pub use index::CorpusIndex;
pub use service::RetrievalService;
pub use tokenize::tokenize;
