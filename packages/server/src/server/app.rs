//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    analyze_sql_handler, create_data_model_handler, excel_report_handler, get_data_model_handler,
    graph_report_handler, health_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps) -> Router {
    let state = AppState {
        deps: Arc::new(deps),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/analyze-sql", post(analyze_sql_handler))
        .route("/get-data-model", post(get_data_model_handler))
        .route("/create-data-model", post(create_data_model_handler))
        .route("/report/excel", post(excel_report_handler))
        .route("/report/graph", post(graph_report_handler))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
