//! Typed errors for the extraction library.

use thiserror::Error;

/// Errors raised by a record store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Target table or dataset does not exist
    #[error("table not found: {0}")]
    NotFound(String),

    /// Connectivity or authentication failure
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Backend accepted the request but reported per-row errors
    #[error("store rejected {} row(s): {}", .0.len(), .0.join("; "))]
    PartialWrite(Vec<String>),

    /// Backend refused the request itself (malformed query, bad identifiers)
    #[error("store rejected request: {0}")]
    Rejected(String),

    /// Client could not be constructed at startup
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded
    #[error("malformed stored row: {0}")]
    Decode(String),
}

/// Errors raised by the language model boundary.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Call exceeded the client timeout
    #[error("model call timed out: {0}")]
    Timeout(String),

    /// Call failed (network, quota, auth, refusal)
    #[error("model call failed: {0}")]
    Call(String),

    /// Model answered without content
    #[error("model returned no content: {0}")]
    Empty(String),
}

/// Errors raised while obtaining an access token.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credentials could be found
    #[error("no credentials available: {0}")]
    Unavailable(String),

    /// A token could not be issued or refreshed
    #[error("access token request failed: {0}")]
    Token(String),
}

impl From<AuthError> for StoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unavailable(_) => StoreError::Unavailable(err.to_string()),
            AuthError::Token(_) => StoreError::Transient(err.to_string()),
        }
    }
}

impl From<AuthError> for ModelError {
    fn from(err: AuthError) -> Self {
        ModelError::Call(err.to_string())
    }
}

/// Errors that abort a consolidation run.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// Records could not be fetched
    #[error("failed to fetch records: {0}")]
    Store(#[from] StoreError),

    /// A merge prompt could not be answered
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised while rendering reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Workbook generation failed
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// Graph payload serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for model calls.
pub type ModelResult<T> = std::result::Result<T, ModelError>;
