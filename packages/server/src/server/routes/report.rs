use axum::{
    extract::Extension,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use sql_extraction::{build_workbook, DataModelGraph, RecordOrder};

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiJson};
use crate::server::routes::data_model::ApplicationRequest;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Workbook of every stored record for an application, ordered by file name.
pub async fn excel_report_handler(
    Extension(state): Extension<AppState>,
    ApiJson(request): ApiJson<ApplicationRequest>,
) -> Result<Response, ApiError> {
    let records = state
        .deps
        .store
        .fetch_records(&request.application_name, RecordOrder::FileName)
        .await
        .map_err(ApiError::internal)?;

    let bytes = build_workbook(&request.application_name, &records).map_err(ApiError::internal)?;
    let disposition = format!(
        "attachment; filename=\"{}_data_model.xlsx\"",
        header_safe(&request.application_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Printable ASCII only, without quotes or backslashes, so the name is a valid
/// quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphSource {
    /// Per-record models as stored
    #[default]
    Stored,
    /// Fresh consolidation run
    Consolidated,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    #[default]
    Html,
    Dot,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct GraphRequest {
    pub application_name: String,
    #[serde(default)]
    pub source: GraphSource,
    #[serde(default)]
    pub format: GraphFormat,
}

/// Entity graph for an application as HTML, Graphviz DOT or vis-network JSON.
pub async fn graph_report_handler(
    Extension(state): Extension<AppState>,
    ApiJson(request): ApiJson<GraphRequest>,
) -> Result<Response, ApiError> {
    let graph = match request.source {
        GraphSource::Stored => {
            let records = state
                .deps
                .store
                .fetch_records(&request.application_name, RecordOrder::FileName)
                .await
                .map_err(ApiError::internal)?;
            DataModelGraph::from_records(&records)
        }
        GraphSource::Consolidated => {
            let result = state
                .deps
                .consolidator
                .consolidate(&request.application_name)
                .await
                .map_err(ApiError::internal)?;
            DataModelGraph::from_consolidated(&result.models)
        }
    };

    tracing::debug!(
        application = %request.application_name,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Graph built"
    );

    let response = match request.format {
        GraphFormat::Html => {
            let title = format!("{} data model", request.application_name);
            let html = graph.to_html(&title).map_err(ApiError::internal)?;
            ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response()
        }
        GraphFormat::Dot => (
            [(header::CONTENT_TYPE, "text/vnd.graphviz; charset=utf-8")],
            graph.to_dot(),
        )
            .into_response(),
        GraphFormat::Json => Json(graph.to_vis_json()).into_response(),
    };

    Ok(response)
}
