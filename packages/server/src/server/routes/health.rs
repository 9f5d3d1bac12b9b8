use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store_backend: String,
    model: String,
}

/// Health check endpoint
///
/// Reports which store backend is wired in; `unavailable` means the service
/// is running without persistence.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_backend = state.deps.store.backend();
    let status = if store_backend == "unavailable" {
        "degraded"
    } else {
        "healthy"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            store_backend: store_backend.to_string(),
            model: state.deps.model.model_name().to_string(),
        }),
    )
}
