//! Language model abstraction.
//!
//! The hosted model is an opaque prompt-to-text function. Prompting and
//! response parsing live in the pipeline, not in implementations.

use async_trait::async_trait;

use crate::error::ModelResult;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier for logs.
    fn model_name(&self) -> &str;

    /// Send a system instruction and a user prompt, returning the raw text.
    async fn generate(&self, system: &str, prompt: &str) -> ModelResult<String>;
}
