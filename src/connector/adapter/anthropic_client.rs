use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::CompletionService;
use crate::domain::{CompletionRequest, CompletionResponse, DomainError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request payload.
#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(serde::Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Minimal subset of the Anthropic Messages API response we care about.
#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

/// HTTP client for the Anthropic Messages API (and compatible endpoints).
///
/// Implements [`CompletionService`] so higher-level components (e.g.
/// [`crate::application::ChatSession`]) stay decoupled from transport and
/// serialization details.
///
/// No request timeout is set: callers layer deadlines on the cancellation
/// token instead. Issues exactly one request/response exchange per call.
///
/// **Configuration** is read once at construction:
///
/// ```text
/// ANTHROPIC_API_KEY=sk-ant-...
/// ANTHROPIC_BASE_URL=https://api.anthropic.com
/// ```
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    /// Full endpoint URL (base + MESSAGES_PATH).
    url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{}", base.trim_end_matches('/'), MESSAGES_PATH);
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            url,
        }
    }

    /// Construct from environment variables:
    /// - `ANTHROPIC_API_KEY`  — optional here; a missing key surfaces as
    ///   [`DomainError::Config`] on the first call and as
    ///   `has_credential() == false` before that
    /// - `ANTHROPIC_BASE_URL` — optional; defaults to the production endpoint
    pub fn from_env() -> Self {
        let key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        let base = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(key, base)
    }

    /// Server-supplied `error.message` when present, else the HTTP status
    /// text.
    fn error_message(raw: &serde_json::Value, status: reqwest::StatusCode) -> String {
        raw.pointer("/error/message")
            .and_then(|message| message.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            })
    }

    /// Concatenate the `text` of every `type == "text"` content block, in
    /// order, ignoring non-textual blocks.
    fn response_text(raw: &serde_json::Value) -> Result<String, DomainError> {
        let response: ApiResponse = serde_json::from_value(raw.clone())
            .map_err(|e| DomainError::remote(format!("failed to parse response: {e}")))?;
        Ok(response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect())
    }

    async fn exchange(&self, request: &CompletionRequest) -> Result<CompletionResponse, DomainError> {
        let body = ApiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            system: request
                .system
                .as_deref()
                .filter(|system| !system.trim().is_empty()),
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("anthropic-dangerous-direct-browser-access", "true")
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::remote(format!("request failed: {e}")))?;

        let status = response.status();
        let raw: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            let message = Self::error_message(&raw, status);
            warn!("AnthropicClient: API returned {status}: {message}");
            return Err(DomainError::remote(message));
        }

        let text = Self::response_text(&raw)?;
        debug!("AnthropicClient: received {} chars", text.len());
        Ok(CompletionResponse { text, raw })
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, DomainError> {
        if !self.has_credential() {
            return Err(DomainError::config("Anthropic API key is required"));
        }
        if request.prompt.trim().is_empty() {
            return Err(DomainError::validation("prompt must be a non-empty string"));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::cancelled("completion call cancelled")),
            result = self.exchange(request) => result,
        }
    }

    fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
