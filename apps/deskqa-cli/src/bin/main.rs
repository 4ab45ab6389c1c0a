use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use deskqa_agent::Agent;
use deskqa_core::config::{expand_path, Config};
use deskqa_core::ingest;
use deskqa_retrieval::service::DEFAULT_ALPHA;
use deskqa_retrieval::RetrievalService;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|search|ask> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn parse_k(args: &[String], default_k: usize) -> usize {
    args.get(1).and_then(|s| s.parse().ok()).unwrap_or(default_k)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let data_dir = args.get(0).map(PathBuf::from).unwrap_or_else(|| {
                expand_path(config.get_or("data.raw_dir", "data/raw".to_string()))
            });
            let corpus_path = expand_path(
                config.get_or("data.corpus_path", "data/index/corpus.jsonl".to_string()),
            );
            println!("Ingesting from {}", data_dir.display());
            let stats = ingest::ingest(&data_dir, &corpus_path)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        "search" => {
            let query = args.get(0).cloned().unwrap_or_else(|| {
                eprintln!("Usage: deskqa search \"<query>\" [k]");
                std::process::exit(1)
            });
            let corpus_path = expand_path(
                config.get_or("data.corpus_path", "data/index/corpus.jsonl".to_string()),
            );
            let alpha: f64 = config.get_or("retrieval.alpha", DEFAULT_ALPHA);
            let retriever = RetrievalService::shared(&corpus_path, alpha);
            let k = parse_k(&args, config.get_or("retrieval.k", 5));
            for hit in retriever.search(&query, k) {
                println!(
                    "{:.4}  (bm25 {:.4} / tfidf {:.4})  {}",
                    hit.hybrid,
                    hit.bm25,
                    hit.tfidf,
                    hit.chunk.tag()
                );
                println!("        {}", hit.chunk.text);
            }
        }
        "ask" => {
            let question = args.get(0).cloned().unwrap_or_else(|| {
                eprintln!("Usage: deskqa ask \"<question>\" [k]");
                std::process::exit(1)
            });
            let agent = Agent::from_config(&config)?;
            let k = parse_k(&args, agent.default_k());
            let resp = agent.answer(&question, k).await;
            println!("{}", resp.answer);
            println!();
            println!(
                "route={} retrieved_k={} latency_ms={:.1} sources={}",
                resp.metrics.route,
                resp.metrics.retrieved_k,
                resp.metrics.latency_ms,
                resp.sources.join(",")
            );
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
