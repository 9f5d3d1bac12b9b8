//! Consolidation: re-prompt stored models down to business entities.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::ConsolidationError;
use crate::pipeline::prompts::{format_consolidation_prompt, CONSOLIDATION_SYSTEM_INSTRUCTION};
use crate::pipeline::response::parse_consolidated;
use crate::traits::{model::LanguageModel, store::RecordStore};
use crate::types::record::{ProcessingStatus, RecordOrder};
use crate::types::result::ConsolidationResult;

/// Reduce a stored model to entity names and relationships.
///
/// Attributes are dropped to keep the merge prompt small; relationships pass
/// through unchanged.
pub fn skim(parser_output: &Value) -> Value {
    let entities: Vec<Value> = parser_output
        .get("entities")
        .and_then(Value::as_array)
        .map(|entities| {
            entities
                .iter()
                .map(|entity| {
                    let name = entity
                        .get("entity_name")
                        .or_else(|| entity.get("name"))
                        .or_else(|| entity.get("table_name"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    json!({ "name": name })
                })
                .collect()
        })
        .unwrap_or_default();

    let relationships = match parser_output.get("relationships") {
        Some(Value::Array(relationships)) => Value::Array(relationships.clone()),
        _ => Value::Array(Vec::new()),
    };

    json!({
        "entities": entities,
        "relationships": relationships,
    })
}

pub struct Consolidator {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn LanguageModel>,
    debug: bool,
}

impl Consolidator {
    pub fn new(store: Arc<dyn RecordStore>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            store,
            model,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// One merge call per stored `NEW` record, newest first.
    ///
    /// Responses that do not parse are counted in `skipped`; a failed model
    /// call aborts the run. Results are not persisted or merged across records.
    #[instrument(skip(self))]
    pub async fn consolidate(
        &self,
        application_name: &str,
    ) -> Result<ConsolidationResult, ConsolidationError> {
        let records = self
            .store
            .fetch_records(application_name, RecordOrder::NewestFirst)
            .await?;

        let mut result = ConsolidationResult {
            records: records.len(),
            ..Default::default()
        };

        for record in &records {
            if record.processing_status != ProcessingStatus::New {
                debug!(sql_id = %record.sql_id, status = %record.processing_status, "Skipping record");
                result.skipped += 1;
                continue;
            }

            let input = serde_json::to_string_pretty(&skim(&record.parser_output))
                .unwrap_or_else(|_| record.parser_output_json());
            let prompt = format_consolidation_prompt(&input);
            if self.debug {
                debug!(sql_id = %record.sql_id, %prompt, "Consolidation prompt");
            }

            let response = self
                .model
                .generate(CONSOLIDATION_SYSTEM_INSTRUCTION, &prompt)
                .await?;
            if self.debug {
                debug!(sql_id = %record.sql_id, %response, "Consolidation response");
            }

            match parse_consolidated(&response) {
                Ok(model) => result.models.push(model),
                Err(e) => {
                    warn!(
                        sql_id = %record.sql_id,
                        file = %record.sql_file_name,
                        error = %e,
                        "Merge response is not valid JSON, skipping record"
                    );
                    result.skipped += 1;
                }
            }
        }

        info!(
            records = result.records,
            models = result.models.len(),
            skipped = result.skipped,
            "Consolidation complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skim_keeps_names_and_relationships() {
        let output = json!({
            "job_metadata": {"job_name": "FR36"},
            "entities": [
                {"entity_name": "ACCOUNT", "attributes": [{"attribute_name": "ID"}]},
                {"name": "CUSTOMER"},
                {"table_name": "BRANCH"}
            ],
            "relationships": [
                {"type": "INNER", "left_entity": "ACCOUNT", "right_entity": "CUSTOMER", "join_conditions": []}
            ]
        });

        assert_eq!(
            skim(&output),
            json!({
                "entities": [{"name": "ACCOUNT"}, {"name": "CUSTOMER"}, {"name": "BRANCH"}],
                "relationships": [
                    {"type": "INNER", "left_entity": "ACCOUNT", "right_entity": "CUSTOMER", "join_conditions": []}
                ]
            })
        );
    }

    #[test]
    fn skim_tolerates_missing_sections() {
        assert_eq!(
            skim(&json!({"relationships": null})),
            json!({"entities": [], "relationships": []})
        );
    }
}
