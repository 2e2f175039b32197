/*!
 * Ollama client.
 *
 * Only the `/api/generate` endpoint is used. Requests are retried with
 * exponential backoff on network and server errors, and an optional rate
 * limit spaces consecutive requests.
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::errors::ProviderError;
use crate::providers::{CompletionPrompt, Provider};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Request timeout in seconds
    timeout_secs: u64,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    rate_limit: Option<u32>,
    /// When the last request was sent
    last_request: Mutex<Option<Instant>>,
}

/// Generate request for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Format to return a response in
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            format: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Set the format
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl From<CompletionPrompt> for GenerationRequest {
    fn from(prompt: CompletionPrompt) -> Self {
        let mut request = GenerationRequest::new(prompt.model, prompt.prompt).temperature(prompt.temperature);
        if let Some(system) = prompt.system {
            request = request.system(system);
        }
        if prompt.json_output {
            request = request.format("json");
        }
        request
    }
}

/// Add a scheme when missing and drop trailing slashes
fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

impl Ollama {
    /// Create a new Ollama client with default retry settings
    pub fn new(endpoint: impl AsRef<str>) -> Self {
        Self::new_with_config(endpoint, 60, 3, 1000, None)
    }

    /// Create a new Ollama client with configuration
    ///
    /// Ollama speaks HTTP/1.1; connections are pooled for concurrent requests.
    pub fn new_with_config(
        endpoint: impl AsRef<str>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        rate_limit: Option<u32>,
    ) -> Self {
        Self {
            base_url: normalize_base_url(endpoint.as_ref()),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            timeout_secs,
            max_retries,
            backoff_base_ms,
            rate_limit: rate_limit.filter(|r| *r > 0),
            last_request: Mutex::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait until the rate limit allows another request
    async fn throttle(&self) {
        let Some(rate_limit) = self.rate_limit else {
            return;
        };
        let interval = Duration::from_millis(60_000 / rate_limit as u64);

        let wait = {
            let mut last = self.last_request.lock();
            let now = Instant::now();
            let wait = last
                .map(|previous| (previous + interval).saturating_duration_since(now))
                .unwrap_or_default();
            *last = Some(now + wait);
            wait
        };

        if !wait.is_zero() {
            debug!("Rate limit: waiting {} ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(16));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            self.throttle().await;

            match self.client.post(&url).json(&request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let response_text = response
                            .text()
                            .await
                            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read Ollama response: {}", e)))?;
                        return parse_generation_response(&response_text);
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    let api_error = ProviderError::ApiError {
                        status_code: status.as_u16(),
                        message: error_text,
                    };

                    if status.is_server_error() {
                        warn!(
                            "Ollama API error: {} - attempt {}/{}",
                            api_error,
                            attempt + 1,
                            self.max_retries + 1
                        );
                        last_error = Some(api_error);
                    } else {
                        // Client errors are not retried
                        error!("Ollama API error: {}", api_error);
                        return Err(api_error);
                    }
                }
                Err(e) => {
                    let provider_error = if e.is_timeout() {
                        ProviderError::Timeout(self.timeout_secs)
                    } else {
                        ProviderError::ConnectionError(format!("Failed to send request to Ollama API: {}", e))
                    };
                    warn!(
                        "Ollama API network error: {} - attempt {}/{}",
                        provider_error,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(provider_error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!(
                "Ollama API request failed after {} attempts",
                self.max_retries + 1
            ))
        }))
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to connect to Ollama: {}", e)))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama version response: {}", e)))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a generate response, accepting a streamed JSONL body as well
fn parse_generation_response(response_text: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(response) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(response);
    }

    // Streamed answers arrive as one JSON object per line
    let chunks: Vec<serde_json::Value> = response_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    let Some(last) = chunks.last() else {
        error!(
            "Failed to parse Ollama API response. Raw response (first 500 chars): {}",
            response_text.chars().take(500).collect::<String>()
        );
        return Err(ProviderError::ParseError(
            "Ollama response contains invalid JSON".to_string(),
        ));
    };

    let response: String = chunks
        .iter()
        .filter_map(|chunk| chunk.get("response").and_then(|v| v.as_str()))
        .collect();

    Ok(GenerationResponse {
        model: last.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
        created_at: last.get("created_at").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        response,
        done: true,
        prompt_eval_count: last.get("prompt_eval_count").and_then(|v| v.as_u64()),
        eval_count: last.get("eval_count").and_then(|v| v.as_u64()),
    })
}

#[async_trait]
impl Provider for Ollama {
    type Request = GenerationRequest;
    type Response = GenerationResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        self.generate(request).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }

    fn extract_text(response: &Self::Response) -> String {
        response.response.clone()
    }
}
