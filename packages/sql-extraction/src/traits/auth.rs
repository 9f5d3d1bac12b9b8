//! Bearer token abstraction for Google Cloud APIs.

use async_trait::async_trait;

use crate::error::AuthError;

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A token that is valid right now. Called once per outgoing request.
    async fn access_token(&self) -> Result<String, AuthError>;
}
