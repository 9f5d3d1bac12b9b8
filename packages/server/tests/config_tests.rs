//! Settings precedence, defaults and validation.

mod common;

use std::collections::HashMap;

use server_core::{Settings, SettingsError, StoreBackend};
use sql_extraction::{PromptVariant, ReportMode};

use crate::common::BASE_YAML;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_defaults_apply() {
    let settings = Settings::from_sources(Some(BASE_YAML), HashMap::new()).unwrap();

    assert_eq!(settings.dataset, "gdm");
    assert_eq!(settings.table, "raw_sql_extracts");
    assert_eq!(settings.llm_model, "gemini-2.5-pro");
    assert_eq!(settings.port, 8000);
    assert_eq!(settings.llm_timeout_secs, 300);
    assert_eq!(settings.store_backend, StoreBackend::Bigquery);
    assert_eq!(settings.prompt.variant, PromptVariant::DataModel);
    assert_eq!(settings.prompt.report, ReportMode::None);
    assert!(!settings.run_agent_with_debug);
}

#[test]
fn test_environment_overrides_file() {
    let settings = Settings::from_sources(
        Some(BASE_YAML),
        vars(&[
            ("APP_PROJECT_ID", "prod-project"),
            ("APP_PORT", "9000"),
            ("APP_RUN_AGENT_WITH_DEBUG", "true"),
            ("APP_STORE_BACKEND", "memory"),
            ("APP_PROMPT__REPORT", "combined"),
            ("APP_PROMPT__VARIANT", "lineage"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.project_id, "prod-project");
    assert_eq!(settings.region, "us-central1");
    assert_eq!(settings.port, 9000);
    assert!(settings.run_agent_with_debug);
    assert_eq!(settings.store_backend, StoreBackend::Memory);
    assert_eq!(settings.prompt.report, ReportMode::Combined);
    assert_eq!(settings.prompt.variant, PromptVariant::Lineage);
    assert_eq!(settings.prompt.work_table_prefix, "WRK_");
}

#[test]
fn test_environment_alone_is_enough() {
    let settings = Settings::from_sources(
        None,
        vars(&[
            ("APP_PROJECT_ID", "p"),
            ("APP_REGION", "europe-west1"),
            ("APP_RUN_AGENT_WITH_DEBUG", "false"),
            ("APP_RAG_DEFAULT_TOP_K", "3"),
            ("APP_RAG_DEFAULT_SEARCH_TOP_K", "7"),
            ("APP_RAG_DEFAULT_VECTOR_DISTANCE_THRESHOLD", "0.25"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.region, "europe-west1");
    assert_eq!(settings.rag_default_search_top_k, 7);
    assert!((settings.rag_default_vector_distance_threshold - 0.25).abs() < f64::EPSILON);
}

#[test]
fn test_missing_required_key_fails() {
    let yaml = "project_id: p\nregion: us-central1\n";

    let result = Settings::from_sources(Some(yaml), HashMap::new());

    assert!(matches!(result, Err(SettingsError::Load(_))));
}

#[test]
fn test_non_boolean_debug_flag_fails() {
    let result = Settings::from_sources(
        Some(BASE_YAML),
        vars(&[("APP_RUN_AGENT_WITH_DEBUG", "sometimes")]),
    );

    assert!(result.is_err());
}

#[test]
fn test_validation_rejects_out_of_range_values() {
    let cases = [
        ("APP_RAG_DEFAULT_TOP_K", "0"),
        ("APP_RAG_DEFAULT_VECTOR_DISTANCE_THRESHOLD", "1.5"),
        ("APP_TOP_P", "1.2"),
        ("APP_LLM_TIMEOUT_SECS", "0"),
        ("APP_STORE_BACKEND", "postgres"),
    ];

    for (key, value) in cases {
        let result = Settings::from_sources(Some(BASE_YAML), vars(&[(key, value)]));
        assert!(
            matches!(result, Err(SettingsError::Invalid(_))),
            "{key}={value} should be rejected"
        );
    }
}

#[test]
fn test_vertex_endpoint_is_derived() {
    let settings = Settings::from_sources(Some(BASE_YAML), HashMap::new()).unwrap();

    assert_eq!(
        settings.llm_endpoint(),
        "https://us-central1-aiplatform.googleapis.com/v1beta1/projects/test-project/locations/us-central1/endpoints/openapi"
    );
    assert_eq!(settings.llm_model_id(), "google/gemini-2.5-pro");
}

#[test]
fn test_custom_endpoint_keeps_model_id() {
    let settings = Settings::from_sources(
        Some(BASE_YAML),
        vars(&[
            ("APP_LLM_BASE_URL", "http://localhost:4000/v1/"),
            ("APP_LLM_MODEL", "gpt-4o"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.llm_endpoint(), "http://localhost:4000/v1");
    assert_eq!(settings.llm_model_id(), "gpt-4o");
}

#[test]
fn test_credentials_resolution() {
    let settings = Settings::from_sources(
        Some(BASE_YAML),
        vars(&[("APP_BIGQUERY_ACCESS_TOKEN", "ya29.token")]),
    )
    .unwrap();
    assert_eq!(settings.google_access_token(), Some("ya29.token"));
    assert_eq!(settings.llm_credential(), None);
    assert!(settings.uses_google_auth());

    let settings = Settings::from_sources(Some(BASE_YAML), HashMap::new()).unwrap();
    assert_eq!(settings.google_access_token(), None);
    assert!(settings.uses_google_auth());

    let settings = Settings::from_sources(
        Some(BASE_YAML),
        vars(&[
            ("APP_STORE_BACKEND", "memory"),
            ("APP_LLM_API_KEY", "sk-local"),
            ("APP_BIGQUERY_ACCESS_TOKEN", " "),
        ]),
    )
    .unwrap();
    assert_eq!(settings.llm_credential(), Some("sk-local"));
    assert_eq!(settings.google_access_token(), None);
    assert!(!settings.uses_google_auth());
}
