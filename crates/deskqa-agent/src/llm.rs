//! Opaque text-generation backends behind one trait. Two interchangeable
//! implementations: a local Ollama-style chat endpoint and an
//! OpenAI-compatible hosted endpoint, selected by configuration. Every call
//! is bounded by a request timeout; the composer treats any failure as
//! recoverable.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Stable label for metrics, e.g. `ollama:llama3.2:3b`.
    fn name(&self) -> String;

    /// One synchronous-style call: prompt in, free text out. An empty
    /// string is a valid successful generation.
    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerateError>;
}

/// Provider selection and connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "off".to_string(),
            model: "llama3.2:3b".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Build the configured backend. `off` (or anything unrecognized) means no
/// generation capability: the composer stays extractive.
pub fn generator_from_config(cfg: &LlmConfig) -> anyhow::Result<Option<Box<dyn Generator>>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    match cfg.provider.as_str() {
        "ollama" => Ok(Some(Box::new(OllamaGenerator {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            timeout_secs: cfg.timeout_secs,
        }))),
        "openai" => {
            let api_key = cfg
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("llm.api_key required for provider 'openai'"))?;
            Ok(Some(Box::new(OpenAiGenerator {
                client,
                base_url: cfg.base_url.trim_end_matches('/').to_string(),
                model: cfg.model.clone(),
                api_key,
                timeout_secs: cfg.timeout_secs,
            })))
        }
        _ => Ok(None),
    }
}

fn transport_error(e: &reqwest::Error, timeout_secs: u64) -> GenerateError {
    if e.is_timeout() {
        GenerateError::Timeout(timeout_secs)
    } else {
        GenerateError::Unavailable(e.to_string())
    }
}

/// Local chat endpoint speaking the Ollama `/api/chat` protocol.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> String {
        format!("ollama:{}", self.model)
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerateError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "stream": false,
            "options": {"temperature": 0.1},
        });
        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GenerateError::Unavailable(format!("status {status}")));
        }
        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
        payload
            .pointer("/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| GenerateError::InvalidResponse("missing message.content".to_string()))
    }
}

/// Hosted OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> String {
        format!("openai:{}", self.model)
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerateError> {
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GenerateError::Unavailable(format!("status {status}")));
        }
        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                GenerateError::InvalidResponse("missing choices[0].message.content".to_string())
            })
    }
}
