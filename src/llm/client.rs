use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Default model used for proposing, scoring, merging and deduplicating
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Configuration for the OpenRouter client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key (from OPENROUTER_API_KEY env var)
    pub api_key: String,
    /// API root, e.g. "https://openrouter.ai/api/v1"
    pub base_url: String,
    /// Model used for the single merge and dedupe calls
    pub consolidation_model: String,
    /// Maximum tokens in a response
    pub max_tokens: u32,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Maximum requests in flight at once
    pub max_in_flight: usize,
}

impl LlmConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .context("OPENROUTER_API_KEY environment variable not set")?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            consolidation_model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_in_flight: 8,
        }
    }
}

/// Bounded attempts with a fixed delay between them
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// One attempt, no retry
    pub fn single() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// A chat completion whose answer must match a JSON schema
#[derive(Debug, Clone)]
pub struct StructuredRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: String,
    pub schema_name: &'static str,
    pub schema: serde_json::Value,
    pub temperature: Option<f64>,
}

/// OpenRouter chat-completions client with structured output
pub struct OpenRouterClient {
    client: Client,
    config: LlmConfig,
    permits: Semaphore,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            permits: Semaphore::new(config.max_in_flight.max(1)),
            config,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send a request and parse the schema-constrained answer
    pub async fn send_structured<T: DeserializeOwned>(&self, request: &StructuredRequest<'_>) -> Result<T> {
        let body = ChatRequest {
            model: request.model.to_string(),
            max_tokens: self.config.max_tokens,
            temperature: request.temperature,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: request.system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: request.schema_name.to_string(),
                    strict: true,
                    schema: request.schema.clone(),
                },
            },
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .context("Request limiter closed")?;

        debug!(model = request.model, schema = request.schema_name, "Sending request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OpenRouter")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenRouter API error: {} - {}", status, body);
        }

        let response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("No message content in response")?;

        serde_json::from_str(&content)
            .with_context(|| format!("Response does not match schema {}", request.schema_name))
    }

    /// Send with bounded fixed-delay retries
    pub async fn send_structured_with_retry<T: DeserializeOwned>(
        &self,
        request: &StructuredRequest<'_>,
        retry: RetryPolicy,
    ) -> Result<T> {
        let mut last_error = None;

        for attempt in 1..=retry.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(retry.delay).await;
            }

            match self.send_structured(request).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) => {
                    warn!(
                        schema = request.schema_name,
                        "Attempt {} of {} failed: {:#}", attempt, retry.max_attempts, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No attempts made")))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
