//! OpenAI-compatible LLM client
//!
//! One POST path serves both chat completions and embeddings. Rate-limited
//! calls are retried with exponential backoff, and generation walks the
//! configured model chain when a model is unusable.

use std::time::Duration;

use rand::Rng;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_BASE_URL, LlmConfig};
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, LlmResponse, Message};

/// Attempts per model before a rate limit is surfaced
const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE_MS: u64 = 1000;

/// Fallback wait when a 429 carries no retry hint
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Phrases in provider errors that mean "this model, not this request"
const MODEL_UNUSABLE_HINTS: &[&str] = &[
    "model not found",
    "decommissioned",
    "unavailable",
    "not available",
    "overloaded",
    "capacity",
];

/// Thread-safe client for chat completions and embeddings.
#[derive(Clone)]
pub struct LlmClient {
    http: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("default_model", &self.config.default_model)
            .finish()
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::LLMError("API key is required".to_string()));
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.as_str()
        }
        .trim_end_matches('/')
        .to_string();

        Ok(Self {
            http,
            config,
            api_key,
            base_url,
        })
    }

    /// Point the client at another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Default model first, then the configured fallbacks
    fn model_chain(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.config.default_model.as_str())
            .chain(self.config.fallback_models.iter().map(String::as_str))
    }

    /// Run a chat completion, moving down the model chain while a model is
    /// rate limited or unusable
    pub async fn chat(&self, messages: Vec<Message>, temperature: f32) -> Result<LlmResponse> {
        let mut last_error = None;

        for model in self.model_chain() {
            let request = ChatRequest::new(model, messages.clone())
                .with_temperature(temperature)
                .with_max_tokens(self.config.max_tokens);

            match self.post::<_, ChatResponse>("chat/completions", &request).await {
                Ok(response) => {
                    let response = LlmResponse::from_chat_response(response)
                        .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))?;
                    info!(model, tokens = response.tokens_used, "Chat completion finished");
                    return Ok(response);
                }
                Err(err) if try_next_model(&err) => {
                    warn!(model, error = %err, "Model unusable, moving to next in chain");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::NoSuitableModel("no model configured".to_string())))
    }

    /// Embed a batch of texts, returning vectors in input order
    pub async fn embed_batch(&self, texts: Vec<String>, model: Option<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let model = model.unwrap_or(&self.config.embedding_model);
        let request = EmbeddingRequest::batch(model, texts);

        let vectors = self
            .post::<_, EmbeddingResponse>("embeddings", &request)
            .await
            .map_err(|err| match err {
                Error::Json(e) => Error::EmbeddingFailed(format!("unreadable response: {}", e)),
                other => other,
            })?
            .into_vectors();

        if vectors.len() != expected {
            return Err(Error::EmbeddingFailed(format!(
                "Expected {} embeddings, got {}",
                expected,
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    /// POST a JSON body, retrying with backoff while rate limited
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url = %url, attempt, "Sending request");

            match self.post_once(&url, body).await {
                Err(Error::RateLimited(retry_after)) if attempt < MAX_ATTEMPTS => {
                    let delay = retry_delay(attempt, retry_after);
                    warn!(attempt, wait_ms = delay.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }

    async fn post_once<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        let text = response.text().await.map_err(Error::NetworkError)?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Map a non-success status and its body onto an error
fn status_error(status: u16, body: &str) -> Error {
    match status {
        401 => Error::LLMError(
            "API key rejected. Set MEDIBOT_API_KEY or GROQ_API_KEY to a valid key.".to_string(),
        ),
        429 => Error::RateLimited(retry_after_secs(body).unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
        404 => Error::LLMError(format!("Model not found: {}", body)),
        500..=599 => Error::LLMError(format!("Provider error {}: {}", status, body)),
        _ => Error::LLMError(format!("Request failed with {}: {}", status, body)),
    }
}

/// Whether generation should move on to the next model
fn try_next_model(err: &Error) -> bool {
    match err {
        Error::RateLimited(_) => true,
        Error::LLMError(msg) => {
            let msg = msg.to_lowercase();
            MODEL_UNUSABLE_HINTS.iter().any(|hint| msg.contains(hint))
        }
        _ => false,
    }
}

/// Exponential delay for an attempt, never shorter than the server's hint,
/// plus up to 10% jitter
fn retry_delay(attempt: u32, retry_after_secs: u64) -> Duration {
    let exponential = BACKOFF_BASE_MS.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    let millis = exponential.max(retry_after_secs.saturating_mul(1000));
    let jitter = rand::thread_rng().gen_range(0..=millis / 10);
    Duration::from_millis(millis + jitter)
}

/// `retry_after` at the top level or under `error`
fn retry_after_secs(body: &str) -> Option<u64> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error")?.get("retry_after"))
        .and_then(serde_json::Value::as_u64)
}
