//! Minimal client for OpenAI-compatible chat completion endpoints.
//!
//! Works against api.openai.com as well as gateways exposing the same
//! `/chat/completions` contract (Vertex AI's OpenAI endpoint, local proxies).
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{ChatRequest, Message, OpenAIClient};
//!
//! let client = OpenAIClient::new(token)
//!     .with_base_url("https://us-central1-aiplatform.googleapis.com/v1beta1/projects/p/locations/us-central1/endpoints/openapi");
//!
//! let response = client
//!     .chat_completion(
//!         ChatRequest::new("google/gemini-2.5-pro")
//!             .message(Message::system("You are a data architect"))
//!             .message(Message::user("Analyze this SQL")),
//!     )
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completion client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl OpenAIClient {
    /// Create a new client with the given bearer token.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    /// Set a custom base URL (Vertex AI, Azure, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAIError::Config(e.to_string()))?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Returns the first choice's text. A choice without content (safety
    /// refusal, empty generation) is reported as [`OpenAIError::EmptyCompletion`].
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.chat_completion_with_token(request, &self.api_key).await
    }

    /// Chat completion authenticated with `token` instead of the configured key.
    ///
    /// For short-lived OAuth2 access tokens that the caller refreshes.
    pub async fn chat_completion_with_token(
        &self,
        request: ChatRequest,
        token: &str,
    ) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Chat completion API error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let choice = raw
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::EmptyCompletion("no choices returned".into()))?;

        let content = choice.message.content.ok_or_else(|| {
            OpenAIError::EmptyCompletion(format!(
                "finish_reason={}",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            response_len = content.len(),
            "Chat completion"
        );

        Ok(ChatResponse {
            content,
            finish_reason: choice.finish_reason,
            usage: raw.usage,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> OpenAIError {
        warn!(error = %e, "Chat completion request failed");
        match self.timeout {
            Some(timeout) if e.is_timeout() => OpenAIError::Timeout(timeout.as_secs()),
            _ => OpenAIError::Network(e.to_string()),
        }
    }
}
