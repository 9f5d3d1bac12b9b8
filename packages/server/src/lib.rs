// SQL Data Model Extraction - API Core
//
// HTTP front end and batch tooling over the sql-extraction pipelines.
// Settings are loaded once at startup and threaded through ServerDeps.

pub mod config;
pub mod kernel;
pub mod server;

pub use crate::config::*;
