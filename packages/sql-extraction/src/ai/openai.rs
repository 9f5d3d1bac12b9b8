//! `LanguageModel` over any OpenAI-compatible chat completions endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::OpenAIClient;
//! use sql_extraction::{ai::OpenAIModel, GoogleAuth};
//!
//! let client = OpenAIClient::new("").with_base_url(vertex_openapi_url);
//! let model = OpenAIModel::new(client, "google/gemini-2.5-pro")
//!     .with_token_source(Arc::new(GoogleAuth::discover().await?))
//!     .with_temperature(1.0);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::traits::{auth::AccessTokenSource, model::LanguageModel};

/// Chat-completions backed model.
///
/// Authenticates with the client's API key, or with a fresh token from the
/// token source on every call when one is set.
#[derive(Clone)]
pub struct OpenAIModel {
    client: OpenAIClient,
    model: String,
    tokens: Option<Arc<dyn AccessTokenSource>>,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl OpenAIModel {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            tokens: None,
            temperature: None,
            top_p: None,
        }
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn AccessTokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> ModelResult<String> {
        let mut request = ChatRequest::new(&self.model)
            .message(Message::system(system))
            .message(Message::user(prompt));
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        if let Some(top_p) = self.top_p {
            request = request.top_p(top_p);
        }

        let response = match &self.tokens {
            Some(tokens) => {
                let token = tokens.access_token().await?;
                self.client.chat_completion_with_token(request, &token).await
            }
            None => self.client.chat_completion(request).await,
        }
        .map_err(map_error)?;

        debug!(
            model = %self.model,
            finish_reason = ?response.finish_reason,
            prompt_tokens = response.usage.as_ref().map(|u| u.prompt_tokens),
            "Model call completed"
        );

        Ok(response.content)
    }
}

fn map_error(err: OpenAIError) -> ModelError {
    match err {
        OpenAIError::Timeout(_) => ModelError::Timeout(err.to_string()),
        OpenAIError::EmptyCompletion(_) => ModelError::Empty(err.to_string()),
        other => ModelError::Call(other.to_string()),
    }
}
