//! The persisted extraction record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::model::ParserOutput;

/// Outcome of one analysis attempt as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// Model output parsed into a data model
    New,
    /// Model output could not be parsed; raw text kept for audit
    Error,
    /// Submission was not processed
    Skipped,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Error => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ERROR" => Ok(Self::Error),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(format!("unknown processing status: {other}")),
        }
    }
}

/// One row per (application, file) analysis attempt.
///
/// Records are append-only: the pipeline constructs them and hands them to a
/// [`RecordStore`](crate::RecordStore), nothing updates or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub sql_id: String,
    pub application_name: String,
    pub sql_file_name: String,
    pub raw_sql_text: String,
    /// Model output exactly as parsed, or the parse failure payload
    pub parser_output: serde_json::Value,
    pub parser_output_tables: Option<String>,
    pub processing_status: ProcessingStatus,
    pub inserted_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// Build a record for a fresh model response, stamping id and write time.
    pub fn new(
        application_name: impl Into<String>,
        sql_file_name: impl Into<String>,
        raw_sql_text: impl Into<String>,
        output: &ParserOutput,
        parser_output_tables: Option<String>,
    ) -> Self {
        Self {
            sql_id: Uuid::new_v4().to_string(),
            application_name: application_name.into(),
            sql_file_name: sql_file_name.into(),
            raw_sql_text: raw_sql_text.into(),
            parser_output: output.to_value(),
            parser_output_tables,
            processing_status: output.status(),
            inserted_at: Utc::now(),
        }
    }

    /// `parser_output` encoded for string-typed columns.
    pub fn parser_output_json(&self) -> String {
        self.parser_output.to_string()
    }

    /// Interpret the stored output.
    pub fn output(&self) -> ParserOutput {
        ParserOutput::from_stored(&self.parser_output)
    }
}

/// Orderings offered by [`RecordStore::query_by_application`](crate::RecordStore::query_by_application).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder {
    /// `inserted_at` descending (data model views, consolidation)
    #[default]
    NewestFirst,
    /// `sql_file_name` ascending, newest first within a file (reports)
    FileName,
}

impl RecordOrder {
    /// Sort in place; used by backends that cannot order server-side.
    pub fn sort(&self, records: &mut [ExtractionRecord]) {
        match self {
            Self::NewestFirst => records.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at)),
            Self::FileName => records.sort_by(|a, b| {
                a.sql_file_name
                    .cmp(&b.sql_file_name)
                    .then_with(|| b.inserted_at.cmp(&a.inserted_at))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::model::ParseFailure;
    use chrono::Duration;

    fn record(file: &str, offset_secs: i64) -> ExtractionRecord {
        let mut record = ExtractionRecord::new(
            "CRM",
            file,
            "SELECT 1 FROM DUAL",
            &ParserOutput::from_response_text(r#"{"entities": []}"#),
            None,
        );
        record.inserted_at = record.inserted_at + Duration::seconds(offset_secs);
        record
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            ProcessingStatus::New,
            ProcessingStatus::Error,
            ProcessingStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(ProcessingStatus::Error).unwrap(),
            serde_json::json!("ERROR")
        );
    }

    #[test]
    fn new_record_takes_status_from_output() {
        let failed = ParserOutput::Failed(ParseFailure::invalid_json("eof", "not json"));
        let record = ExtractionRecord::new("CRM", "a.sql", "SELECT", &failed, None);

        assert_eq!(record.processing_status, ProcessingStatus::Error);
        assert_eq!(record.parser_output["response_text"], "not json");
        assert!(Uuid::parse_str(&record.sql_id).is_ok());
    }

    #[test]
    fn newest_first_ordering() {
        let mut records = vec![record("a.sql", 0), record("b.sql", 10), record("c.sql", 5)];
        RecordOrder::NewestFirst.sort(&mut records);

        let files: Vec<_> = records.iter().map(|r| r.sql_file_name.as_str()).collect();
        assert_eq!(files, vec!["b.sql", "c.sql", "a.sql"]);
    }

    #[test]
    fn file_name_ordering() {
        let mut records = vec![record("b.sql", 0), record("a.sql", 10), record("c.sql", 5)];
        RecordOrder::FileName.sort(&mut records);

        let files: Vec<_> = records.iter().map(|r| r.sql_file_name.as_str()).collect();
        assert_eq!(files, vec!["a.sql", "b.sql", "c.sql"]);
    }
}
