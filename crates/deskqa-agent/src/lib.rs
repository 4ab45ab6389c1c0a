//! deskqa-agent
//!
//! Routes a question to the price tool or the retrieval pipeline, composes
//! the answer (generative with a strict citation contract, or extractive),
//! and guarantees every emitted citation traces back to retrieved
//! evidence.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod compose;
pub mod llm;
pub mod prices;
pub mod router;
pub mod sanitize;

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use deskqa_core::config::{expand_path, Config};
use deskqa_core::types::{AnswerResponse, Citation, Extra, Metrics, Route};
use deskqa_retrieval::service::DEFAULT_ALPHA;
use deskqa_retrieval::RetrievalService;

use crate::compose::{build_evidence, build_user_prompt, extractive_answer};
use crate::llm::{generator_from_config, Generator, LlmConfig};
use crate::prices::PriceStore;
use crate::router::PriceIntent;
use crate::sanitize::sanitize_citations;

const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant context in the provided documents.";
const FALLBACK_SYSTEM_PROMPT: &str =
    "Answer using provided context only; cite chunks like [doc@start:end].";
/// At most this many fallback tags are appended by the sanitizer.
const MAX_FALLBACK_TAGS: usize = 3;

pub struct Agent {
    retriever: Arc<RetrievalService>,
    prices: PriceStore,
    generator: Option<Box<dyn Generator>>,
    system_prompt: String,
    default_k: usize,
}

impl Agent {
    pub fn new(
        retriever: Arc<RetrievalService>,
        prices: PriceStore,
        generator: Option<Box<dyn Generator>>,
        system_prompt: String,
    ) -> Self {
        Self { retriever, prices, generator, system_prompt, default_k: 5 }
    }

    /// Wire up the whole pipeline from configuration. Never fails on
    /// missing data files: the retriever comes up with an empty corpus and
    /// the price store comes up empty.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let corpus_path = expand_path(
            config.get_or("data.corpus_path", "data/index/corpus.jsonl".to_string()),
        );
        let alpha: f64 = config.get_or("retrieval.alpha", DEFAULT_ALPHA);
        let retriever = RetrievalService::shared(&corpus_path, alpha);

        let prices_path =
            expand_path(config.get_or("data.prices_path", "data/prices.json".to_string()));
        let prices = PriceStore::load(&prices_path).unwrap_or_else(|e| {
            warn!("price store unavailable: {e:#}");
            PriceStore::empty(&prices_path.to_string_lossy())
        });

        let llm_config = LlmConfig {
            provider: config.get_or("llm.provider", LlmConfig::default().provider),
            model: config.get_or("llm.model", LlmConfig::default().model),
            base_url: config.get_or("llm.base_url", LlmConfig::default().base_url),
            api_key: config.get("llm.api_key").ok(),
            timeout_secs: config.get_or("llm.timeout_secs", llm::DEFAULT_TIMEOUT_SECS),
        };
        let generator = generator_from_config(&llm_config)?;

        let prompt_path =
            config.get_or("prompts.system_path", "prompts/answer_system.txt".to_string());
        let system_prompt = load_system_prompt(&prompt_path);

        let mut agent = Self::new(retriever, prices, generator, system_prompt);
        agent.default_k = config.get_or("retrieval.k", agent.default_k);
        Ok(agent)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Answer one question end to end. Generation failures degrade to the
    /// extractive path; nothing on this route returns an error to the
    /// caller.
    pub async fn answer(&self, question: &str, k: usize) -> AnswerResponse {
        let started = Instant::now();
        let mut resp = if router::is_price_query(question) {
            self.answer_price(question)
        } else {
            self.answer_rag(question, k).await
        };
        resp.metrics.latency_ms = elapsed_ms(started);
        info!(
            route = %resp.metrics.route,
            retrieved_k = resp.metrics.retrieved_k,
            latency_ms = resp.metrics.latency_ms,
            "answered"
        );
        resp
    }

    async fn answer_rag(&self, question: &str, k: usize) -> AnswerResponse {
        let hits = self.retriever.search(question, k);
        if hits.is_empty() {
            return AnswerResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                citations: Vec::new(),
                sources: Vec::new(),
                metrics: metrics(Route::Rag, 0, &["retriever"]),
            };
        }

        let evidence = build_evidence(&hits);
        let allowed: Vec<String> = evidence.iter().map(|e| e.tag.clone()).collect();

        let (answer, route, mut extra_tools) = match &self.generator {
            Some(generator) => {
                let user_prompt = build_user_prompt(question, &evidence);
                match generator.generate(&self.system_prompt, &user_prompt).await {
                    Ok(text) => {
                        let fallback = &allowed[..allowed.len().min(MAX_FALLBACK_TAGS)];
                        let answer = sanitize_citations(&text, &allowed, fallback);
                        (answer, Route::RagLlm, vec!["retriever".to_string(), generator.name()])
                    }
                    Err(e) => {
                        warn!("generation failed, falling back to extractive answer: {e}");
                        (extractive_answer(&evidence), Route::Rag, vec!["retriever".to_string()])
                    }
                }
            }
            None => (extractive_answer(&evidence), Route::Rag, vec!["retriever".to_string()]),
        };

        // Structured citations always reflect the retrieval evidence,
        // independent of what the generator wrote.
        let citations: Vec<Citation> =
            hits.iter().map(|h| Citation::for_chunk(&h.chunk)).collect();
        let mut sources: Vec<String> = hits.iter().map(|h| h.chunk.source.clone()).collect();
        sources.sort();
        sources.dedup();

        let mut m = metrics(route, hits.len(), &[]);
        m.extra.insert("used_tools".to_string(), extra_tools.join(","));
        if route == Route::RagLlm {
            if let Some(model) = extra_tools.pop() {
                m.extra.insert("model".to_string(), model);
            }
        }
        AnswerResponse { answer, citations, sources, metrics: m }
    }

    fn answer_price(&self, question: &str) -> AnswerResponse {
        let known = self.prices.symbols();
        let source = self.prices.source().to_string();
        match router::parse_price_intent(question, &known) {
            PriceIntent::LatestClose(sym) => match self.prices.latest_close(&sym) {
                Some(latest) => price_response(
                    format!(
                        "Latest close for {sym} was {} on {}. [{source}@0:0]",
                        latest.close, latest.date
                    ),
                    vec![Citation::sentinel(&source)],
                    &source,
                    1,
                ),
                None => price_response(
                    format!("No price data available for {sym}."),
                    Vec::new(),
                    &source,
                    0,
                ),
            },
            PriceIntent::Compare { a, b, points } => {
                match self.prices.compare_performance(&a, &b, points) {
                    Some(perf) => price_response(
                        format!(
                            "Over ~{points} points, {a} returned {:.2}%, {b} returned {:.2}% \
                             (relative {:.2}% for {a}). [{source}@0:0]",
                            perf.a_return * 100.0,
                            perf.b_return * 100.0,
                            perf.relative * 100.0
                        ),
                        vec![Citation::sentinel(&source)],
                        &source,
                        1,
                    ),
                    None => {
                        let mut missing = Vec::new();
                        if self.prices.latest_n(&a, 2).is_none() {
                            missing.push(format!("{a} not available"));
                        }
                        if self.prices.latest_n(&b, 2).is_none() {
                            missing.push(format!("{b} not available"));
                        }
                        let detail = if missing.is_empty() {
                            "insufficient data".to_string()
                        } else {
                            missing.join(", ")
                        };
                        price_response(
                            format!("Cannot compare {a} vs {b}: {detail}."),
                            Vec::new(),
                            &source,
                            0,
                        )
                    }
                }
            }
            PriceIntent::Listing => price_response(
                format!(
                    "I can answer price questions for available symbols: {}.",
                    known.join(", ")
                ),
                Vec::new(),
                &source,
                0,
            ),
        }
    }
}

fn load_system_prompt(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text.trim().to_string(),
        Err(_) => FALLBACK_SYSTEM_PROMPT.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn metrics(route: Route, retrieved_k: usize, used_tools: &[&str]) -> Metrics {
    let mut extra = Extra::new();
    if !used_tools.is_empty() {
        extra.insert("used_tools".to_string(), used_tools.join(","));
    }
    Metrics { latency_ms: 0.0, retrieved_k, route, extra }
}

fn price_response(
    answer: String,
    citations: Vec<Citation>,
    source: &str,
    retrieved_k: usize,
) -> AnswerResponse {
    AnswerResponse {
        answer,
        citations,
        sources: vec![source.to_string()],
        metrics: metrics(Route::Price, retrieved_k, &["prices_tool"]),
    }
}
