//! Sequential scan of a folder of `.sql` files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::extract::Extractor;
use crate::types::result::{ExtractRequest, ExtractionResult};

/// Tallies for one folder scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Files that produced a record (`NEW` or `ERROR`)
    pub extracted: usize,
    /// Files already completed for the application
    pub skipped: usize,
    /// Files whose model call failed
    pub failed: usize,
    /// Empty files, not submitted
    pub empty: usize,
    /// Extracted files whose record could not be stored
    pub unpersisted: usize,
    pub results: Vec<ExtractionResult>,
}

impl BatchSummary {
    fn record(&mut self, result: ExtractionResult) {
        match &result {
            ExtractionResult::Extracted { persisted, .. } => {
                self.extracted += 1;
                if !persisted {
                    self.unpersisted += 1;
                }
            }
            ExtractionResult::Skipped { .. } => self.skipped += 1,
            ExtractionResult::ModelFailed { .. } => self.failed += 1,
        }
        self.results.push(result);
    }
}

/// UTF-8 when valid, otherwise windows-1252.
fn decode_sql(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            text.into_owned()
        }
    }
}

/// `*.sql` files directly inside `dir`, sorted by name.
pub async fn list_sql_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_sql = path.extension().is_some_and(|ext| ext == "sql");
        if is_sql && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Run every script in `dir` through the extractor, one at a time.
///
/// Files that are not valid UTF-8 are read as windows-1252. Dedup is left to the
/// extractor, so re-running a scan only calls the model for new files.
pub async fn scan_directory(
    extractor: &Extractor,
    dir: &Path,
    application_name: &str,
) -> std::io::Result<BatchSummary> {
    let files = list_sql_files(dir).await?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "No SQL files found");
    }

    let mut summary = BatchSummary::default();

    for path in files {
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Could not read file");
                summary.failed += 1;
                continue;
            }
        };

        let sql_text = decode_sql(bytes);
        if sql_text.trim().is_empty() {
            info!(file = %file_name, "File is empty, skipping");
            summary.empty += 1;
            continue;
        }

        let result = extractor
            .extract(ExtractRequest::new(
                sql_text,
                application_name,
                file_name,
            ))
            .await;
        summary.record(result);
    }

    info!(
        extracted = summary.extracted,
        skipped = summary.skipped,
        failed = summary.failed,
        empty = summary.empty,
        "Folder scan complete"
    );

    Ok(summary)
}
