use crate::error::{OracleError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// The external text-generation service.
///
/// Implementations must be cheap to share behind an `Arc`: the build
/// orchestrator and summary generator issue calls from multiple worker
/// tasks concurrently.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one prompt and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpOracleConfig {
    /// Full URL of the generateContent-style endpoint.
    pub endpoint: String,
    /// API key, sent as the `x-goog-api-key` header.
    pub api_key: String,
    pub request_timeout: Duration,
}

impl HttpOracleConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Oracle backed by an HTTP text-generation endpoint.
pub struct HttpOracle {
    config: HttpOracleConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl HttpOracle {
    pub fn new(config: HttpOracleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OracleError::Fatal(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    OracleError::Transient(e.to_string())
                } else {
                    OracleError::Fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(OracleError::RateLimited(status.to_string()));
        }
        if status.is_server_error() {
            return Err(OracleError::Transient(format!("server error: {status}")));
        }
        if !status.is_success() {
            return Err(OracleError::Fatal(format!("unexpected status: {status}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(text)
    }
}
