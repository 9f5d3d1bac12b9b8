use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sql_extraction::{ExtractRequest, ExtractionResult};

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiJson};

#[derive(Debug, Deserialize)]
pub struct AnalyzeSqlRequest {
    pub sql_query: String,
    pub application_name: String,
    pub sql_file_name: String,
}

/// Analyze one SQL script.
///
/// Answers `{parser_output, report_markdown}`, or a `skipped` status when the
/// file already has a successful record for the application.
pub async fn analyze_sql_handler(
    Extension(state): Extension<AppState>,
    ApiJson(request): ApiJson<AnalyzeSqlRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .deps
        .extractor
        .extract(ExtractRequest::new(
            request.sql_query,
            request.application_name,
            request.sql_file_name,
        ))
        .await;

    match result {
        ExtractionResult::Extracted {
            parser_output,
            report_markdown,
            ..
        } => Ok(Json(json!({
            "parser_output": parser_output,
            "report_markdown": report_markdown,
        }))
        .into_response()),
        skipped @ ExtractionResult::Skipped { .. } => Ok(Json(skipped).into_response()),
        ExtractionResult::ModelFailed { error, .. } => Err(ApiError::Internal(error)),
    }
}
