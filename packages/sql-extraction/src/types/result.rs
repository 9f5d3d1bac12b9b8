//! Pipeline inputs and outcomes.

use serde::Serialize;

use crate::types::model::ConsolidatedModel;
use crate::types::record::ProcessingStatus;

/// One SQL script submitted for analysis.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub sql_text: String,
    pub application_name: String,
    pub file_name: String,
}

impl ExtractRequest {
    pub fn new(
        sql_text: impl Into<String>,
        application_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            sql_text: sql_text.into(),
            application_name: application_name.into(),
            file_name: file_name.into(),
        }
    }
}

/// Outcome of [`Extractor::extract`](crate::Extractor::extract).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    /// The model answered and a record was written (or the write was attempted).
    Extracted {
        sql_id: String,
        sql_file_name: String,
        processing_status: ProcessingStatus,
        parser_output: serde_json::Value,
        report_markdown: Option<String>,
        /// False when the store rejected or could not take the record
        persisted: bool,
    },

    /// The file already has a successful record for this application.
    Skipped {
        sql_file_name: String,
        message: String,
    },

    /// The model call failed; nothing was persisted.
    ModelFailed { sql_file_name: String, error: String },
}

impl ExtractionResult {
    pub fn sql_file_name(&self) -> &str {
        match self {
            Self::Extracted { sql_file_name, .. }
            | Self::Skipped { sql_file_name, .. }
            | Self::ModelFailed { sql_file_name, .. } => sql_file_name,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Outcome of [`Consolidator::consolidate`](crate::Consolidator::consolidate).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationResult {
    /// Records fetched for the application
    pub records: usize,
    /// Successfully parsed per-record models, in fetch order
    pub models: Vec<ConsolidatedModel>,
    /// Records left out (not `NEW`, or the merge response did not parse)
    pub skipped: usize,
}
