//! Core trait abstractions.
//!
//! Applications pick a concrete store and model; the pipelines only see these
//! traits.

pub mod auth;
pub mod model;
pub mod store;
