//! Integration tests for scanning a folder of SQL scripts.

use std::sync::Arc;

use sql_extraction::{scan_directory, testing::MockModel, Extractor, MemoryStore};
use tempfile::TempDir;

const VALID_MODEL: &str = r#"{"entities": [{"entity_name": "T"}], "relationships": []}"#;

fn write(dir: &TempDir, name: &str, contents: &[u8]) {
    std::fs::write(dir.path().join(name), contents).unwrap();
}

#[tokio::test]
async fn test_scan_processes_sql_files_in_order() {
    let dir = TempDir::new().unwrap();
    write(&dir, "b.sql", b"SELECT * FROM B_TABLE");
    write(&dir, "a.sql", b"SELECT * FROM A_TABLE");
    write(&dir, "empty.sql", b"   \n");
    write(&dir, "notes.txt", b"SELECT * FROM IGNORED");
    // windows-1252 bytes that are not valid UTF-8
    write(&dir, "c.sql", b"SELECT * FROM CAF\xc9_TABLE");

    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(MockModel::new().with_default_response(VALID_MODEL));
    let extractor = Extractor::new(store.clone(), model.clone());

    let summary = scan_directory(&extractor, dir.path(), "CRM").await.unwrap();

    assert_eq!(summary.extracted, 3);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);

    let files: Vec<_> = summary.results.iter().map(|r| r.sql_file_name()).collect();
    assert_eq!(files, vec!["a.sql", "b.sql", "c.sql"]);
    assert!(!model.was_called_with("IGNORED"));
    assert_eq!(store.records()[2].raw_sql_text, "SELECT * FROM CAF\u{c9}_TABLE");
}

#[tokio::test]
async fn test_windows_1252_script_reaches_prompt_intact() {
    let dir = TempDir::new().unwrap();
    write(&dir, "cafe.sql", b"SELECT 'Caf\xe9' FROM T");

    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(MockModel::new().with_default_response(VALID_MODEL));
    let extractor = Extractor::new(store.clone(), model.clone());

    scan_directory(&extractor, dir.path(), "CRM").await.unwrap();

    assert_eq!(store.records()[0].raw_sql_text, "SELECT 'Caf\u{e9}' FROM T");
    assert!(model.was_called_with("SELECT 'Caf\u{e9}' FROM T"));
    assert!(!model.was_called_with("\u{FFFD}"));
}

#[tokio::test]
async fn test_rescan_skips_completed_files() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.sql", b"SELECT * FROM A_TABLE");

    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(MockModel::new().with_default_response(VALID_MODEL));
    let extractor = Extractor::new(store.clone(), model.clone());

    scan_directory(&extractor, dir.path(), "CRM").await.unwrap();
    write(&dir, "b.sql", b"SELECT * FROM B_TABLE");
    let second = scan_directory(&extractor, dir.path(), "CRM").await.unwrap();

    assert_eq!(second.skipped, 1);
    assert_eq!(second.extracted, 1);
    assert_eq!(model.call_count(), 2);
    assert_eq!(store.record_count(), 2);
}

#[tokio::test]
async fn test_missing_directory_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(MockModel::new());
    let extractor = Extractor::new(store, model);

    let missing = std::env::temp_dir().join("sql-extraction-does-not-exist");
    assert!(scan_directory(&extractor, &missing, "CRM").await.is_err());
}
