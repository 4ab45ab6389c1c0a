use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use deskqa_agent::llm::{GenerateError, Generator};
use deskqa_agent::prices::{PricePoint, PriceStore};
use deskqa_agent::Agent;
use deskqa_core::types::{Chunk, Route};
use deskqa_retrieval::{CorpusIndex, RetrievalService};

const SYSTEM_PROMPT: &str = "Answer using provided context only; cite chunks like [doc@start:end].";

struct CannedGenerator {
    text: String,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Generator for CannedGenerator {
    fn name(&self) -> String {
        "test:canned".to_string()
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String, GenerateError> {
        self.called.store(true, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> String {
        "test:failing".to_string()
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String, GenerateError> {
        Err(GenerateError::Timeout(1))
    }
}

fn letter_chunk() -> Chunk {
    Chunk {
        source: "q2_letter.html".to_string(),
        start: 0,
        end: 20,
        text: "SPY rallied in Q2 amid macro tailwinds".to_string(),
    }
}

fn retriever(chunks: Vec<Chunk>) -> Arc<RetrievalService> {
    Arc::new(RetrievalService::new(CorpusIndex::from_chunks(chunks), 0.65))
}

fn price_store() -> PriceStore {
    PriceStore::from_series(
        "prices_stub/prices.json",
        HashMap::from([
            (
                "MSFT".to_string(),
                vec![
                    PricePoint { close: 425.5, date: "2024-06-27".to_string() },
                    PricePoint { close: 430.1, date: "2024-06-28".to_string() },
                ],
            ),
            (
                "SPY".to_string(),
                vec![
                    PricePoint { close: 540.0, date: "2024-06-27".to_string() },
                    PricePoint { close: 545.4, date: "2024-06-28".to_string() },
                ],
            ),
        ]),
    )
}

fn agent(chunks: Vec<Chunk>, generator: Option<Box<dyn Generator>>) -> Agent {
    Agent::new(retriever(chunks), price_store(), generator, SYSTEM_PROMPT.to_string())
}

#[tokio::test]
async fn price_smoke_latest_close() {
    let agent = agent(Vec::new(), None);
    let resp = agent.answer("What is the most recent close for MSFT?", 5).await;
    assert_eq!(resp.metrics.route, Route::Price);
    assert!(resp.answer.contains("MSFT"));
    assert!(resp.answer.contains("430.1"));
    assert!(resp.answer.contains("2024-06-28"));
    assert_eq!(resp.sources, vec!["prices_stub/prices.json".to_string()]);
    assert_eq!(resp.citations.len(), 1);
    assert_eq!((resp.citations[0].start, resp.citations[0].end), (0, 0));
}

#[tokio::test]
async fn unknown_symbol_is_not_an_error() {
    let agent = agent(Vec::new(), None);
    let resp = agent.answer("What was the last price for NVDA?", 5).await;
    assert_eq!(resp.metrics.route, Route::Price);
    assert_eq!(resp.answer, "No price data available for NVDA.");
    assert!(resp.citations.is_empty());
}

#[tokio::test]
async fn compare_reports_both_returns() {
    let agent = agent(Vec::new(), None);
    let resp = agent.answer("Compare MSFT performance to SPY over 2 days", 5).await;
    assert_eq!(resp.metrics.route, Route::Price);
    assert!(resp.answer.contains("MSFT returned 1.08%"));
    assert!(resp.answer.contains("SPY returned 1.00%"));
    assert_eq!(resp.citations.len(), 1);
}

#[tokio::test]
async fn price_question_without_symbol_lists_coverage() {
    let agent = agent(Vec::new(), None);
    let resp = agent.answer("What was the latest move?", 5).await;
    assert_eq!(resp.metrics.route, Route::Price);
    assert!(resp.answer.contains("MSFT, SPY"));
}

#[tokio::test]
async fn extractive_answer_carries_citations_and_sources() {
    let agent = agent(vec![letter_chunk()], None);
    let resp = agent.answer("Did the letter mention SPY?", 3).await;
    assert_eq!(resp.metrics.route, Route::Rag);
    assert!(resp.answer.contains("SPY rallied in Q2"));
    assert!(resp.answer.contains("[q2_letter.html@0:20]"));
    assert_eq!(resp.citations.len(), 1);
    assert_eq!(resp.citations[0].source, "q2_letter.html");
    assert_eq!(resp.sources, vec!["q2_letter.html".to_string()]);
    assert_eq!(resp.metrics.retrieved_k, 1);
}

#[tokio::test]
async fn generated_answer_keeps_valid_tags() {
    let generator = CannedGenerator {
        text: "The letter says SPY rallied [q2_letter.html@0:20] in Q2.".to_string(),
        called: Arc::new(AtomicBool::new(false)),
    };
    let agent = agent(vec![letter_chunk()], Some(Box::new(generator)));
    let resp = agent.answer("Did the letter mention SPY?", 3).await;
    assert_eq!(resp.metrics.route, Route::RagLlm);
    assert!(resp.answer.contains("[q2_letter.html@0:20]"));
    assert_eq!(resp.citations.len(), 1);
    assert_eq!(resp.metrics.extra.get("model").map(String::as_str), Some("test:canned"));
}

#[tokio::test]
async fn uncited_generation_gets_fallback_tags() {
    let generator = CannedGenerator {
        text: "The letter discussed a rally [hallucinated@1:2].".to_string(),
        called: Arc::new(AtomicBool::new(false)),
    };
    let agent = agent(vec![letter_chunk()], Some(Box::new(generator)));
    let resp = agent.answer("Did the letter mention SPY?", 3).await;
    assert!(!resp.answer.contains("hallucinated"));
    assert!(resp.answer.ends_with("[q2_letter.html@0:20]"));
}

#[tokio::test]
async fn generation_failure_falls_back_to_extractive() {
    let agent = agent(vec![letter_chunk()], Some(Box::new(FailingGenerator)));
    let resp = agent.answer("Did the letter mention SPY?", 3).await;
    assert_eq!(resp.metrics.route, Route::Rag);
    assert!(resp.answer.contains("SPY rallied in Q2"));
    assert!(resp.answer.contains("[q2_letter.html@0:20]"));
    assert_eq!(resp.citations.len(), 1);
}

#[tokio::test]
async fn empty_retrieval_skips_generation() {
    let called = Arc::new(AtomicBool::new(false));
    let generator = CannedGenerator { text: "should not run".to_string(), called: Arc::clone(&called) };
    let agent = agent(Vec::new(), Some(Box::new(generator)));
    let resp = agent.answer("Did the letter mention SPY?", 3).await;
    assert_eq!(resp.metrics.route, Route::Rag);
    assert_eq!(resp.answer, "I couldn't find relevant context in the provided documents.");
    assert!(resp.citations.is_empty());
    assert!(resp.sources.is_empty());
    assert!(!called.load(Ordering::SeqCst));
}
