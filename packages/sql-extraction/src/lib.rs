//! SQL Data Model Extraction Library
//!
//! Reverse-engineers entities, attributes, relationships and lineage from SQL
//! scripts by prompting a hosted language model, and keeps one append-only
//! record per (application, file) analysis in an analytical store.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sql_extraction::{ExtractRequest, Extractor, MemoryStore};
//! use sql_extraction::testing::MockModel;
//!
//! let store = Arc::new(MemoryStore::new());
//! let model = Arc::new(MockModel::new().with_default_response(r#"{"entities": []}"#));
//! let extractor = Extractor::new(store, model);
//!
//! let result = extractor
//!     .extract(ExtractRequest::new("SELECT * FROM T", "CRM", "a.sql"))
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Store and language model abstractions
//! - [`types`] - Records, parsed data models and pipeline results
//! - [`auth`] - Access token sources for Google Cloud
//! - [`stores`] - BigQuery, PostgreSQL and in-memory record stores
//! - [`pipeline`] - Extraction, consolidation and folder scanning
//! - [`report`] - Spreadsheet and graph rendering
//! - [`testing`] - Mock implementations for testing

pub mod auth;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

pub use auth::{GoogleAuth, StaticToken};
pub use error::{AuthError, ConsolidationError, ModelError, ReportError, StoreError};
pub use traits::{auth::AccessTokenSource, model::LanguageModel, store::RecordStore};
pub use types::{
    model::{
        Attribute, AttributeMapping, ConsolidatedEntity, ConsolidatedModel,
        ConsolidatedRelationship, DataFlow, DataModel, Entity, EntityRole, JobMetadata,
        ParseFailure, ParserOutput, Relationship,
    },
    record::{ExtractionRecord, ProcessingStatus, RecordOrder},
    result::{ConsolidationResult, ExtractRequest, ExtractionResult},
};

pub use pipeline::{
    scan_directory, BatchSummary, Consolidator, Extractor, PromptConfig, PromptVariant,
    ReportMode,
};
pub use report::{build_workbook, sanitize_sheet_name, DataModelGraph, EdgeKind};

pub use stores::{BigQueryConfig, BigQueryStore, MemoryStore, UnavailableStore};

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

#[cfg(feature = "openai")]
pub use ai::OpenAIModel;
