//! Per-file extraction: dedup check, prompt, parse, persist.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::error::ModelResult;
use crate::pipeline::locks::KeyedLocks;
use crate::pipeline::prompts::{PromptConfig, ReportMode, SYSTEM_INSTRUCTION};
use crate::pipeline::response::{parse_data_model, split_combined, strip_outer_fence};
use crate::traits::{model::LanguageModel, store::RecordStore};
use crate::types::record::ExtractionRecord;
use crate::types::result::{ExtractRequest, ExtractionResult};

/// Scripts shorter than this are replaced by [`NO_SQL`].
pub const MIN_SQL_LENGTH: usize = 10;

/// Stand-in text for empty or trivial submissions.
pub const NO_SQL: &str = "No SQL";

/// Substitute the sentinel for input too short to analyze.
pub fn normalize_sql(sql_text: &str) -> &str {
    if sql_text.chars().count() < MIN_SQL_LENGTH {
        NO_SQL
    } else {
        sql_text
    }
}

/// Runs the extraction pipeline for single SQL scripts.
///
/// # Example
///
/// ```rust,ignore
/// let extractor = Extractor::new(store, model).with_prompts(PromptConfig {
///     report: ReportMode::Combined,
///     ..Default::default()
/// });
///
/// match extractor.extract(ExtractRequest::new(sql, "CRM", "a.sql")).await {
///     ExtractionResult::Extracted { processing_status, .. } => println!("{processing_status}"),
///     ExtractionResult::Skipped { message, .. } => println!("{message}"),
///     ExtractionResult::ModelFailed { error, .. } => eprintln!("{error}"),
/// }
/// ```
pub struct Extractor {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn LanguageModel>,
    prompts: PromptConfig,
    debug: bool,
    locks: KeyedLocks,
}

impl Extractor {
    pub fn new(store: Arc<dyn RecordStore>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            store,
            model,
            prompts: PromptConfig::default(),
            debug: false,
            locks: KeyedLocks::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    /// Log full prompts and responses at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Analyze one script and record the outcome.
    ///
    /// Never fails: store problems degrade (dedup skipped, `persisted: false`)
    /// and model failures come back as [`ExtractionResult::ModelFailed`].
    #[instrument(skip(self, request), fields(application = %request.application_name, file = %request.file_name))]
    pub async fn extract(&self, request: ExtractRequest) -> ExtractionResult {
        let ExtractRequest {
            sql_text,
            application_name,
            file_name,
        } = request;

        let _guard = self.locks.lock(&application_name, &file_name).await;

        if self.is_completed(&application_name, &file_name).await {
            info!("File already processed, skipping");
            return ExtractionResult::Skipped {
                message: format!(
                    "File '{file_name}' has already been processed for application '{application_name}'."
                ),
                sql_file_name: file_name,
            };
        }

        let sql = normalize_sql(&sql_text);
        if sql == NO_SQL {
            debug!(length = sql_text.len(), "Input below minimum length, using sentinel");
        }

        let (response, report) = match self.call_model(sql).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "Model call failed, nothing persisted");
                return ExtractionResult::ModelFailed {
                    sql_file_name: file_name,
                    error: e.to_string(),
                };
            }
        };

        let output = parse_data_model(&response);
        if output.model().is_none() {
            warn!("Model response is not a valid data model, recording ERROR");
        }

        let record = ExtractionRecord::new(
            application_name,
            file_name,
            sql,
            &output,
            report.clone(),
        );

        let persisted = match self.store.insert(&record).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    backend = self.store.backend(),
                    sql_id = %record.sql_id,
                    error = %e,
                    "Failed to persist extraction record"
                );
                false
            }
        };

        info!(
            sql_id = %record.sql_id,
            status = %record.processing_status,
            persisted,
            "Extraction complete"
        );

        ExtractionResult::Extracted {
            sql_id: record.sql_id,
            sql_file_name: record.sql_file_name,
            processing_status: record.processing_status,
            parser_output: record.parser_output,
            report_markdown: report,
            persisted,
        }
    }

    /// A failed lookup counts as "not completed" so the store being down
    /// never blocks extraction.
    async fn is_completed(&self, application_name: &str, file_name: &str) -> bool {
        match self.store.list_completed_file_names(application_name).await {
            Ok(completed) => completed.contains(file_name),
            Err(e) => {
                warn!(
                    backend = self.store.backend(),
                    error = %e,
                    "Completed-files lookup failed, continuing without dedup"
                );
                false
            }
        }
    }

    /// Returns the JSON response text and the markdown report, if any.
    async fn call_model(&self, sql: &str) -> ModelResult<(String, Option<String>)> {
        let prompt = self.prompts.extraction_prompt(sql);
        if self.debug {
            debug!(model = self.model.model_name(), %prompt, "Extraction prompt");
        }

        let answer = match self.prompts.report {
            ReportMode::None => (self.model.generate(SYSTEM_INSTRUCTION, &prompt).await?, None),
            ReportMode::Separate => {
                let report_prompt = self.prompts.report_prompt(sql);
                let (response, report) = tokio::try_join!(
                    self.model.generate(SYSTEM_INSTRUCTION, &prompt),
                    self.model.generate(SYSTEM_INSTRUCTION, &report_prompt),
                )?;
                let report = strip_outer_fence(&report).to_string();
                (response, (!report.is_empty()).then_some(report))
            }
            ReportMode::Combined => {
                let combined = self.model.generate(SYSTEM_INSTRUCTION, &prompt).await?;
                let (json, report) = split_combined(&combined);
                (json.to_string(), report.map(str::to_string))
            }
        };

        if self.debug {
            debug!(response = %answer.0, report = ?answer.1, "Model response");
        }

        Ok(answer)
    }
}
