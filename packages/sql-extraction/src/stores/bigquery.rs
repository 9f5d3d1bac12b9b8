//! BigQuery record store over the REST API.
//!
//! Writes go through `tabledata.insertAll` (streaming inserts) with `sql_id` as
//! the `insertId`. Reads run a parameterized standard-SQL query through
//! `jobs.query` and long-poll `jobs.getQueryResults` until the job completes,
//! following `pageToken` until the result set is exhausted.
//!
//! The expected table schema:
//!
//! | column | type |
//! |---|---|
//! | `sql_id` | STRING |
//! | `application_name` | STRING |
//! | `sql_file_name` | STRING |
//! | `raw_sql_text` | STRING |
//! | `parser_output` | STRING (JSON text) |
//! | `parser_output_tables` | STRING, nullable |
//! | `processing_status` | STRING |
//! | `inserted_at` | TIMESTAMP |

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::traits::{auth::AccessTokenSource, store::RecordStore};
use crate::types::record::{ExtractionRecord, ProcessingStatus, RecordOrder};

pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// How long one `jobs.query` / `getQueryResults` call waits server-side.
const QUERY_WAIT_MS: u64 = 10_000;

const COLUMNS: &str = "sql_id, application_name, sql_file_name, raw_sql_text, \
                       parser_output, parser_output_tables, processing_status, inserted_at";

/// Location of the extracts table.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub base_url: String,
}

impl BigQueryConfig {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fully qualified `project.dataset.table` id.
    pub fn table_id(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }

    /// Identifiers end up inside a query string, so only plain names pass.
    fn validate(&self) -> StoreResult<()> {
        let valid_project = !self.project.is_empty()
            && self
                .project
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_project {
            return Err(StoreError::Unavailable(format!(
                "invalid BigQuery project id: {:?}",
                self.project
            )));
        }

        for (kind, name) in [("dataset", &self.dataset), ("table", &self.table)] {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(StoreError::Unavailable(format!(
                    "invalid BigQuery {kind} name: {name:?}"
                )));
            }
        }

        Ok(())
    }
}

/// Record store backed by a BigQuery table.
pub struct BigQueryStore {
    client: reqwest::Client,
    config: BigQueryConfig,
    tokens: Arc<dyn AccessTokenSource>,
}

impl BigQueryStore {
    /// Validate the configuration and build the HTTP client.
    ///
    /// Fails with [`StoreError::Unavailable`] when identifiers are unusable;
    /// nothing is sent over the network here. A bearer token is taken from
    /// `tokens` for every request.
    pub fn new(config: BigQueryConfig, tokens: Arc<dyn AccessTokenSource>) -> StoreResult<Self> {
        config.validate()?;

        info!(table = %config.table_id(), "BigQuery store configured");

        Ok(Self {
            client: reqwest::Client::new(),
            config,
            tokens,
        })
    }

    async fn bearer(&self) -> StoreResult<String> {
        Ok(self.tokens.access_token().await?)
    }

    fn table_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.config.base_url, self.config.project, self.config.dataset, self.config.table
        )
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.config.base_url, self.config.project
        )
    }

    /// Run a query with a single `@application_name` parameter and collect all rows.
    async fn run_query(&self, sql: &str, application_name: &str) -> StoreResult<Vec<Row>> {
        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "application_name",
                "parameterType": {"type": "STRING"},
                "parameterValue": {"value": application_name},
            }],
            "timeoutMs": QUERY_WAIT_MS,
        });

        let token = self.bearer().await?;
        let resp = self
            .client
            .post(self.queries_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let mut page: QueryResponse = read_json(resp).await?;

        let mut rows = Vec::new();
        let mut fields: Option<Vec<String>> = None;

        loop {
            if !page.job_complete {
                debug!(job = ?page.job_reference, "Query job still running");
            } else {
                if fields.is_none() {
                    fields = page.schema.take().map(|s| s.fields.into_iter().map(|f| f.name).collect());
                }
                let names = fields.as_deref().unwrap_or_default();
                for raw in page.rows.take().unwrap_or_default() {
                    rows.push(Row::from_raw(names, raw));
                }

                if page.page_token.is_none() {
                    return Ok(rows);
                }
            }

            let job = page.job_reference.clone().ok_or_else(|| {
                StoreError::Decode("query response has no job reference".to_string())
            })?;
            page = self.get_query_results(&job, page.page_token.as_deref()).await?;
        }
    }

    async fn get_query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> StoreResult<QueryResponse> {
        let mut params: Vec<(&str, String)> = vec![("timeoutMs", QUERY_WAIT_MS.to_string())];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let token = self.bearer().await?;
        let resp = self
            .client
            .get(format!("{}/{}", self.queries_url(), job.job_id))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(resp).await
    }
}

#[async_trait]
impl RecordStore for BigQueryStore {
    fn backend(&self) -> &'static str {
        "bigquery"
    }

    #[instrument(skip(self, record), fields(sql_id = %record.sql_id, file = %record.sql_file_name))]
    async fn insert(&self, record: &ExtractionRecord) -> StoreResult<()> {
        let body = InsertAllRequest {
            rows: vec![InsertRow {
                insert_id: &record.sql_id,
                json: RowJson::from(record),
            }],
        };

        let token = self.bearer().await?;
        let resp = self
            .client
            .post(format!("{}/insertAll", self.table_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let result: InsertAllResponse = read_json(resp).await?;

        if !result.insert_errors.is_empty() {
            let messages = result
                .insert_errors
                .into_iter()
                .flat_map(|e| {
                    let index = e.index;
                    e.errors.into_iter().map(move |err| {
                        format!(
                            "row {index}: {} ({})",
                            err.message.unwrap_or_default(),
                            err.reason.unwrap_or_default()
                        )
                    })
                })
                .collect();
            return Err(StoreError::PartialWrite(messages));
        }

        debug!(table = %self.config.table_id(), "Inserted record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query_by_application(
        &self,
        application_name: &str,
        order: RecordOrder,
    ) -> StoreResult<Vec<ExtractionRecord>> {
        let order_by = match order {
            RecordOrder::NewestFirst => "inserted_at DESC",
            RecordOrder::FileName => "sql_file_name ASC, inserted_at DESC",
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM `{}` WHERE application_name = @application_name ORDER BY {order_by}",
            self.config.table_id()
        );

        self.run_query(&sql, application_name)
            .await?
            .into_iter()
            .map(|row| row.into_record())
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_completed_file_names(
        &self,
        application_name: &str,
    ) -> StoreResult<BTreeSet<String>> {
        let sql = format!(
            "SELECT DISTINCT sql_file_name FROM `{}` \
             WHERE application_name = @application_name AND processing_status = 'NEW'",
            self.config.table_id()
        );

        Ok(self
            .run_query(&sql, application_name)
            .await?
            .into_iter()
            .filter_map(|mut row| row.take_string("sql_file_name"))
            .collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    #[serde(rename = "insertId")]
    insert_id: &'a str,
    json: RowJson<'a>,
}

#[derive(Serialize)]
struct RowJson<'a> {
    sql_id: &'a str,
    application_name: &'a str,
    sql_file_name: &'a str,
    raw_sql_text: &'a str,
    parser_output: String,
    parser_output_tables: Option<&'a str>,
    processing_status: &'static str,
    inserted_at: String,
}

impl<'a> From<&'a ExtractionRecord> for RowJson<'a> {
    fn from(record: &'a ExtractionRecord) -> Self {
        Self {
            sql_id: &record.sql_id,
            application_name: &record.application_name,
            sql_file_name: &record.sql_file_name,
            raw_sql_text: &record.raw_sql_text,
            parser_output: record.parser_output_json(),
            parser_output_tables: record.parser_output_tables.as_deref(),
            processing_status: record.processing_status.as_str(),
            inserted_at: record.inserted_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
struct InsertAllResponse {
    #[serde(rename = "insertErrors", default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Deserialize)]
struct InsertError {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    rows: Option<Vec<RawRow>>,
    page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(default)]
    f: Vec<RawCell>,
}

#[derive(Deserialize)]
struct RawCell {
    #[serde(default)]
    v: Value,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// One result row keyed by column name.
struct Row(HashMap<String, Value>);

impl Row {
    fn from_raw(fields: &[String], raw: RawRow) -> Self {
        Self(
            fields
                .iter()
                .cloned()
                .zip(raw.f.into_iter().map(|cell| cell.v))
                .collect(),
        )
    }

    fn take_string(&mut self, column: &str) -> Option<String> {
        match self.0.remove(column) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    fn require(&mut self, column: &str) -> StoreResult<String> {
        self.take_string(column)
            .ok_or_else(|| StoreError::Decode(format!("missing column {column}")))
    }

    fn into_record(mut self) -> StoreResult<ExtractionRecord> {
        let parser_output_text = self.require("parser_output")?;
        let parser_output = serde_json::from_str(&parser_output_text)
            .map_err(|e| StoreError::Decode(format!("parser_output is not JSON: {e}")))?;
        let processing_status: ProcessingStatus = self
            .require("processing_status")?
            .parse()
            .map_err(StoreError::Decode)?;
        let inserted_at = parse_timestamp(&self.require("inserted_at")?)?;

        Ok(ExtractionRecord {
            sql_id: self.require("sql_id")?,
            application_name: self.require("application_name")?,
            sql_file_name: self.require("sql_file_name")?,
            raw_sql_text: self.require("raw_sql_text")?,
            parser_output,
            parser_output_tables: self.take_string("parser_output_tables"),
            processing_status,
            inserted_at,
        })
    }
}

/// TIMESTAMP cells come back as epoch seconds (`"1.7000000001E9"`); RFC 3339 is
/// accepted for tables that store the column as a string.
fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    if let Ok(seconds) = value.parse::<f64>() {
        let micros = (seconds * 1_000_000.0).round() as i64;
        return Utc
            .timestamp_micros(micros)
            .single()
            .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {value}")));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("invalid timestamp {value:?}: {e}")))
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Transient(err.to_string())
}

/// Map the HTTP status onto the store error taxonomy and decode success bodies.
async fn read_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> StoreResult<T> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()));
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    Err(match status.as_u16() {
        404 => StoreError::NotFound(message),
        401 | 403 | 408 | 429 => StoreError::Transient(message),
        code if code >= 500 => StoreError::Transient(message),
        _ => StoreError::Rejected(message),
    })
}
