//! Language model adapters.
//!
//! Reference implementations of the `LanguageModel` trait. Tests use
//! [`MockModel`](crate::testing::MockModel) instead.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAIModel;
