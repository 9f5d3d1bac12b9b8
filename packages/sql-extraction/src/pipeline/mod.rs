//! Extraction and consolidation pipelines.
//!
//! - [`extract`] - dedup check, prompt, parse and persist one script
//! - [`consolidate`] - skim stored models and re-prompt for business entities
//! - [`batch`] - sequential folder scan
//! - [`prompts`] / [`response`] - prompt templates and response cleanup

pub mod batch;
pub mod consolidate;
pub mod extract;
pub mod locks;
pub mod prompts;
pub mod response;

pub use batch::{list_sql_files, scan_directory, BatchSummary};
pub use consolidate::{skim, Consolidator};
pub use extract::{normalize_sql, Extractor, MIN_SQL_LENGTH, NO_SQL};
pub use prompts::{PromptConfig, PromptVariant, ReportMode, REPORT_MARKER};
pub use response::{parse_consolidated, parse_data_model, split_combined, strip_code_fences};
