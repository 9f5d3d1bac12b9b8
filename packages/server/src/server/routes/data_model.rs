use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use sql_extraction::{ConsolidatedModel, ExtractionRecord, RecordOrder};

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiJson};

#[derive(Debug, Deserialize)]
pub struct ApplicationRequest {
    pub application_name: String,
}

/// Stored records for an application, newest first.
pub async fn get_data_model_handler(
    Extension(state): Extension<AppState>,
    ApiJson(request): ApiJson<ApplicationRequest>,
) -> Result<Json<Vec<ExtractionRecord>>, ApiError> {
    let records = state
        .deps
        .store
        .fetch_records(&request.application_name, RecordOrder::NewestFirst)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(records))
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateDataModelResponse {
    Success {
        results: Vec<ConsolidatedModel>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        error_message: String,
    },
}

/// Re-prompt every stored record into an entity/relationship model.
///
/// Failures are reported in the body with a 200, not as an HTTP error.
pub async fn create_data_model_handler(
    Extension(state): Extension<AppState>,
    ApiJson(request): ApiJson<ApplicationRequest>,
) -> Json<CreateDataModelResponse> {
    let response = match state
        .deps
        .consolidator
        .consolidate(&request.application_name)
        .await
    {
        Ok(result) if result.records == 0 => CreateDataModelResponse::Success {
            results: Vec::new(),
            message: Some("No records found for the application.".to_string()),
        },
        Ok(result) => CreateDataModelResponse::Success {
            results: result.models,
            message: None,
        },
        Err(e) => {
            tracing::warn!(application = %request.application_name, error = %e, "Consolidation failed");
            CreateDataModelResponse::Error {
                error_message: e.to_string(),
            }
        }
    };

    Json(response)
}
