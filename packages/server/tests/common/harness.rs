//! Test harness that serves the router in-process.
//!
//! Requests go through `tower::ServiceExt::oneshot`, backed by an in-memory
//! store and a scripted model, so no network or cloud credentials are needed.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use server_core::{kernel::ServerDeps, server::build_app, Settings};
use sql_extraction::{testing::MockModel, MemoryStore, RecordStore};
use tower::ServiceExt;

/// Minimal valid settings document.
pub const BASE_YAML: &str = r#"
project_id: test-project
region: us-central1
run_agent_with_debug: false
rag_default_top_k: 5
rag_default_search_top_k: 10
rag_default_vector_distance_threshold: 0.5
"#;

pub fn test_settings() -> Settings {
    Settings::from_sources(Some(BASE_YAML), HashMap::new()).expect("base settings are valid")
}

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub model: Arc<MockModel>,
    router: Router,
}

impl TestHarness {
    pub fn new(model: MockModel) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), model)
    }

    pub fn with_store(store: Arc<MemoryStore>, model: MockModel) -> Self {
        let model = Arc::new(model);
        let deps = ServerDeps::new(store.clone(), model.clone(), &test_settings());

        Self {
            store,
            model,
            router: build_app(deps),
        }
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> TestResponse {
        self.post_raw(path, body.to_string()).await
    }

    pub async fn post_raw(&self, path: &str, body: impl Into<String>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.into()))
            .unwrap();
        send(self.router.clone(), request).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        send(self.router.clone(), request).await
    }
}

/// Router over any store, for degrade paths.
pub fn router_with_store(store: Arc<dyn RecordStore>, model: MockModel) -> Router {
    build_app(ServerDeps::new(store, Arc::new(model), &test_settings()))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    TestResponse {
        status,
        content_type,
        body,
    }
}
