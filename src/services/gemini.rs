use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PlannerError, Result};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

/// Backoff policy for quota-limited generation calls.
///
/// Retries apply only to the quota signal (HTTP 429 or a
/// `RESOURCE_EXHAUSTED` error status); every other failure is terminal on
/// the first attempt. `max_elapsed` optionally bounds the total wall clock
/// spent sleeping between attempts; the default policy has none.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2,
            max_elapsed: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based): 1s, 2s, 4s, ...
    /// for the default policy.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.base_delay * self.multiplier.saturating_pow(attempt as u32)
    }
}

/// Connection settings for the generation endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    /// Build the config from `GEMINI_API_KEY`, with optional
    /// `GEMINI_BASE_URL` and `GEMINI_MODEL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            PlannerError::Config(
                "GEMINI_API_KEY environment variable must be set before creating a client"
                    .to_string(),
            )
        })?;

        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(endpoint) = std::env::var("GEMINI_BASE_URL") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
}

// Generation endpoint wire structures

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    status: Option<String>,
    message: Option<String>,
}

/// Outcome of a single HTTP attempt, before retry handling.
enum Attempt {
    Text(String),
    Quota(String),
    Fatal(PlannerError),
}

/// Client for the AI text-generation endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                PlannerError::Config(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }

    /// Send one prompt and return the raw response text.
    ///
    /// Quota signals are retried per the configured [`RetryPolicy`];
    /// exhaustion surfaces [`PlannerError::QuotaExceeded`], everything else
    /// [`PlannerError::GenerationFailed`].
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            match self.attempt_once(prompt).await {
                Attempt::Text(text) => return Ok(text),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Quota(message) => {
                    if attempt >= self.retry.max_retries {
                        warn!(attempts = attempt + 1, "quota signal persisted, giving up");
                        return Err(PlannerError::QuotaExceeded {
                            attempts: attempt + 1,
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    if let Some(ceiling) = self.retry.max_elapsed {
                        if started.elapsed() + delay > ceiling {
                            warn!(attempts = attempt + 1, "retry ceiling reached, giving up");
                            return Err(PlannerError::QuotaExceeded {
                                attempts: attempt + 1,
                            });
                        }
                    }

                    debug!(
                        target: "trip_planner::gemini",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %message,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt_once(&self, prompt: &str) -> Attempt {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = match self.http.post(self.request_url()).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                return Attempt::Fatal(PlannerError::GenerationFailed(format!(
                    "HTTP request failed: {err}"
                )))
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                return Attempt::Fatal(PlannerError::GenerationFailed(format!(
                    "failed to read response body: {err}"
                )))
            }
        };

        let parsed: GenerateResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                return Attempt::Fatal(PlannerError::GenerationFailed(format!(
                    "endpoint returned unparseable body (HTTP {status}): {err}"
                )))
            }
        };

        let error_status = parsed
            .error
            .as_ref()
            .and_then(|e| e.status.as_deref())
            .unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS || error_status == QUOTA_STATUS {
            let message = parsed
                .error
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Attempt::Quota(message);
        }

        if !status.is_success() || parsed.error.is_some() {
            let message = parsed
                .error
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| text.clone());
            return Attempt::Fatal(PlannerError::GenerationFailed(format!(
                "API error (HTTP {status}): {message}"
            )));
        }

        let content = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);

        match content {
            Some(text) => Attempt::Text(text),
            None => Attempt::Fatal(PlannerError::GenerationFailed(
                "no content in response".to_string(),
            )),
        }
    }
}
