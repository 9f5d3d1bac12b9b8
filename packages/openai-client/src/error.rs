//! Error types for the chat completion client.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// Client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be established or was reset
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Non-2xx response (quota, auth, invalid request, safety refusal)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered but produced no usable completion
    #[error("Empty completion: {0}")]
    EmptyCompletion(String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}
