//! HTTP contract tests: status codes and body shapes per route.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use sql_extraction::{
    testing::{FailingStore, MockModel},
    ModelError, ParseFailure, StoreError, UnavailableStore,
};

use crate::common::{router_with_store, send, TestHarness};

const VALID_MODEL: &str = r#"{
    "job_metadata": {"job_name": "load_accounts"},
    "entities": [
        {"entity_name": "STG_ACCOUNTS", "entity_role": "SOURCE_TABLE", "attributes": []},
        {"entity_name": "DIM_ACCOUNT", "entity_role": "TARGET_TABLE", "attributes": []}
    ],
    "relationships": [
        {"left_entity": "STG_ACCOUNTS", "right_entity": "DIM_ACCOUNT", "type": "loads"}
    ]
}"#;

const CONSOLIDATED: &str = r#"```json
{"entities": [{"name": "DIM_ACCOUNT"}, {"name": "CUSTOMER"}],
 "relationships": [{"from": "CUSTOMER", "to": "DIM_ACCOUNT", "type": "owns"}]}
```"#;

fn analyze_body(file: &str) -> serde_json::Value {
    json!({
        "sql_query": "INSERT INTO DIM_ACCOUNT SELECT * FROM STG_ACCOUNTS",
        "application_name": "CRM",
        "sql_file_name": file,
    })
}

fn harness() -> TestHarness {
    TestHarness::new(
        MockModel::new()
            .with_response_for("Input JSON", CONSOLIDATED)
            .with_default_response(VALID_MODEL),
    )
}

#[tokio::test]
async fn test_health_reports_backend_and_model() {
    let harness = harness();

    let response = harness.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store_backend"], "memory");
    assert_eq!(body["model"], "mock-model");
}

#[tokio::test]
async fn test_health_reports_degraded_without_store() {
    let router = router_with_store(
        Arc::new(UnavailableStore::new("no credentials")),
        MockModel::new(),
    );

    let response = send(
        router,
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "degraded");
    assert_eq!(response.json()["store_backend"], "unavailable");
}

#[tokio::test]
async fn test_analyze_returns_parser_output() {
    let harness = harness();

    let response = harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["parser_output"]["entities"][0]["entity_name"], "STG_ACCOUNTS");
    assert!(body["report_markdown"].is_null());
    assert_eq!(harness.store.record_count(), 1);
}

#[tokio::test]
async fn test_analyze_resubmission_is_skipped() {
    let harness = harness();

    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;
    let response = harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "skipped");
    assert_eq!(body["sql_file_name"], "a.sql");
    assert!(body["message"].as_str().unwrap().contains("CRM"));
    assert_eq!(harness.model.call_count(), 1);
    assert_eq!(harness.store.record_count(), 1);
}

#[tokio::test]
async fn test_analyze_unparseable_answer_still_succeeds() {
    let harness = TestHarness::new(MockModel::new().with_default_response("no json here"));

    let response = harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["parser_output"]["error"], ParseFailure::INVALID_JSON);
    assert_eq!(body["parser_output"]["response_text"], "no json here");
}

#[tokio::test]
async fn test_analyze_model_failure_is_500() {
    let harness = TestHarness::new(
        MockModel::new().with_failure(ModelError::Call("quota exceeded".into())),
    );

    let response = harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json()["detail"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));
    assert_eq!(harness.store.record_count(), 0);
}

#[tokio::test]
async fn test_analyze_missing_field_is_422() {
    let harness = harness();

    let response = harness
        .post_json("/analyze-sql", json!({ "sql_query": "SELECT 1" }))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json()["detail"].is_string());
    assert_eq!(harness.model.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_malformed_json_is_422() {
    let harness = harness();

    let response = harness.post_raw("/analyze-sql", "{not json").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json()["detail"].is_string());
}

#[tokio::test]
async fn test_get_data_model_lists_records() {
    let harness = harness();
    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;
    harness.post_json("/analyze-sql", analyze_body("b.sql")).await;

    let response = harness
        .post_json("/get-data-model", json!({ "application_name": "CRM" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let records = response.json();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["application_name"], "CRM");
    assert_eq!(records[0]["processing_status"], "NEW");
}

#[tokio::test]
async fn test_get_data_model_unknown_application_is_empty() {
    let harness = harness();

    let response = harness
        .post_json("/get-data-model", json!({ "application_name": "nonexistent" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!([]));
}

#[tokio::test]
async fn test_get_data_model_store_failure_is_500() {
    let router = router_with_store(
        Arc::new(FailingStore::new().failing_query(StoreError::Transient("timeout".into()))),
        MockModel::new(),
    );

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/get-data-model")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"application_name": "CRM"}"#))
        .unwrap();
    let response = send(router, request).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json()["detail"].as_str().unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_create_data_model_without_records() {
    let harness = harness();

    let response = harness
        .post_json("/create-data-model", json!({ "application_name": "CRM" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["results"], json!([]));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_create_data_model_returns_models() {
    let harness = harness();
    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    let response = harness
        .post_json("/create-data-model", json!({ "application_name": "CRM" }))
        .await;

    let body = response.json();
    assert_eq!(body["status"], "success");
    assert!(body.get("message").is_none());
    assert_eq!(body["results"][0]["entities"][1]["name"], "CUSTOMER");
    assert_eq!(body["results"][0]["relationships"][0]["type"], "owns");
    assert!(harness.model.was_called_with("STG_ACCOUNTS"));
}

#[tokio::test]
async fn test_create_data_model_failure_is_reported_in_body() {
    let harness = TestHarness::new(
        MockModel::new()
            .with_failure_for("Input JSON", ModelError::Timeout("300s".into()))
            .with_default_response(VALID_MODEL),
    );
    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    let response = harness
        .post_json("/create-data-model", json!({ "application_name": "CRM" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "error");
    assert!(body["error_message"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_excel_report_is_xlsx() {
    let harness = harness();
    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    let response = harness
        .post_json("/report/excel", json!({ "application_name": "CRM" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    );
    assert_eq!(&response.body[..2], b"PK");
}

#[tokio::test]
async fn test_excel_report_without_records_still_builds() {
    let harness = harness();

    let response = harness
        .post_json("/report/excel", json!({ "application_name": "nonexistent" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..2], b"PK");
}

#[tokio::test]
async fn test_excel_report_for_name_with_control_characters() {
    let harness = harness();

    let response = harness
        .post_json(
            "/report/excel",
            json!({ "application_name": "CRM\nFinance\u{0007} \"Q1\"" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..2], b"PK");
}

#[tokio::test]
async fn test_graph_report_formats() {
    let harness = harness();
    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    let dot = harness
        .post_json(
            "/report/graph",
            json!({ "application_name": "CRM", "format": "dot" }),
        )
        .await;
    assert_eq!(dot.status, StatusCode::OK);
    assert!(dot.text().starts_with("digraph"));
    assert!(dot.text().contains("\"STG_ACCOUNTS\" -> \"DIM_ACCOUNT\""));

    let payload = harness
        .post_json(
            "/report/graph",
            json!({ "application_name": "CRM", "format": "json" }),
        )
        .await;
    assert_eq!(payload.json()["nodes"].as_array().unwrap().len(), 2);

    let html = harness
        .post_json("/report/graph", json!({ "application_name": "CRM" }))
        .await;
    assert!(html.content_type.as_ref().unwrap().starts_with("text/html"));
    assert!(html.text().contains("CRM data model"));
}

#[tokio::test]
async fn test_graph_report_from_consolidation() {
    let harness = harness();
    harness.post_json("/analyze-sql", analyze_body("a.sql")).await;

    let response = harness
        .post_json(
            "/report/graph",
            json!({ "application_name": "CRM", "source": "consolidated", "format": "dot" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("\"CUSTOMER\" -> \"DIM_ACCOUNT\""));
    assert!(!response.text().contains("STG_ACCOUNTS"));
}

#[tokio::test]
async fn test_graph_report_rejects_unknown_format() {
    let harness = harness();

    let response = harness
        .post_json(
            "/report/graph",
            json!({ "application_name": "CRM", "format": "svg" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}
