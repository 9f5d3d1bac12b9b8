//! Integration tests for the consolidation pipeline.

use std::sync::Arc;

use sql_extraction::{
    testing::{FailingStore, MockModel},
    ConsolidationError, Consolidator, ExtractionRecord, MemoryStore, ModelError, ParseFailure,
    ParserOutput, RecordStore, StoreError,
};

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    let good = ExtractionRecord::new(
        "CRM",
        "a.sql",
        "SELECT * FROM ACCOUNT JOIN CUSTOMER ON ACCOUNT.CUST_ID = CUSTOMER.ID",
        &ParserOutput::from_response_text(
            r#"{"entities": [{"entity_name": "ACCOUNT", "attributes": [{"attribute_name": "SECRET_COLUMN"}]},
                             {"entity_name": "CUSTOMER"}],
                "relationships": [{"type": "INNER", "left_entity": "ACCOUNT", "right_entity": "CUSTOMER"}]}"#,
        ),
        None,
    );
    let failed = ExtractionRecord::new(
        "CRM",
        "b.sql",
        "SELECT broken",
        &ParserOutput::Failed(ParseFailure::invalid_json("eof", "{")),
        None,
    );
    let other_app = ExtractionRecord::new(
        "HR",
        "c.sql",
        "SELECT * FROM EMPLOYEE",
        &ParserOutput::from_response_text(r#"{"entities": [{"entity_name": "EMPLOYEE"}]}"#),
        None,
    );

    for record in [&good, &failed, &other_app] {
        store.insert(record).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_consolidates_new_records_only() {
    let store = seeded_store().await;
    let model = Arc::new(MockModel::new().with_default_response(
        r#"```json
{"entities": [{"name": "ACCOUNT"}, {"name": "CUSTOMER"}],
 "relationships": [{"from": "CUSTOMER", "to": "ACCOUNT", "type": "owns", "details": "CUST_ID"}]}
```"#,
    ));
    let consolidator = Consolidator::new(store, model.clone());

    let result = consolidator.consolidate("CRM").await.unwrap();

    assert_eq!(result.records, 2);
    assert_eq!(result.models.len(), 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.models[0].entities.len(), 2);
    assert_eq!(result.models[0].relationships[0].kind.as_deref(), Some("owns"));

    // One call for the single NEW record; attributes are skimmed away.
    assert_eq!(model.call_count(), 1);
    assert!(model.was_called_with("\"ACCOUNT\""));
    assert!(!model.was_called_with("SECRET_COLUMN"));
}

#[tokio::test]
async fn test_unparseable_merge_response_is_skipped() {
    let store = seeded_store().await;
    let model = Arc::new(MockModel::new().with_default_response("I cannot help with that."));
    let consolidator = Consolidator::new(store, model);

    let result = consolidator.consolidate("CRM").await.unwrap();

    assert!(result.models.is_empty());
    assert_eq!(result.skipped, 2);
}

#[tokio::test]
async fn test_model_failure_aborts() {
    let store = seeded_store().await;
    let model = Arc::new(MockModel::new().with_failure(ModelError::Call("quota exceeded".into())));
    let consolidator = Consolidator::new(store, model);

    let err = consolidator.consolidate("CRM").await.unwrap_err();

    assert!(matches!(err, ConsolidationError::Model(_)));
    assert!(err.to_string().contains("quota exceeded"));
}

#[tokio::test]
async fn test_unknown_application_has_no_records() {
    let store = seeded_store().await;
    let model = Arc::new(MockModel::new());
    let consolidator = Consolidator::new(store, model.clone());

    let result = consolidator.consolidate("nonexistent").await.unwrap();

    assert_eq!(result.records, 0);
    assert!(result.models.is_empty());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_missing_table_reads_as_empty_but_outage_fails() {
    let model = Arc::new(MockModel::new());

    let missing = Arc::new(
        FailingStore::new().failing_query(StoreError::NotFound("raw_sql_extracts".into())),
    );
    let result = Consolidator::new(missing, model.clone())
        .consolidate("CRM")
        .await
        .unwrap();
    assert_eq!(result.records, 0);

    let down = Arc::new(FailingStore::new().failing_query(StoreError::Transient("timeout".into())));
    let err = Consolidator::new(down, model)
        .consolidate("CRM")
        .await
        .unwrap_err();
    assert!(matches!(err, ConsolidationError::Store(StoreError::Transient(_))));
}
