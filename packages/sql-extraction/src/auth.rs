//! Access token sources.
//!
//! [`GoogleAuth`] resolves Application Default Credentials once at startup
//! (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud user credentials or the metadata
//! server) and asks the provider for a token on every request. The provider
//! caches tokens and refreshes them before they expire.
//!
//! [`StaticToken`] serves a fixed token and never refreshes; it is meant for
//! explicit overrides and local gateways.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::AuthError;
use crate::traits::auth::AccessTokenSource;

/// Covers both BigQuery and Vertex AI.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const SCOPES: &[&str] = &[CLOUD_PLATFORM_SCOPE];

/// A fixed bearer token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Result<Self, AuthError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthError::Unavailable("empty access token".to_string()));
        }
        Ok(Self(token))
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials.
pub struct GoogleAuth {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl GoogleAuth {
    /// Find credentials in the environment.
    pub async fn discover() -> Result<Self, AuthError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        info!("Using Google Application Default Credentials");
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccessTokenSource for GoogleAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        let token = self
            .provider
            .token(SCOPES)
            .await
            .map_err(|e| AuthError::Token(e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}
