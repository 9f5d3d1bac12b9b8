//! Record store abstraction.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::types::record::{ExtractionRecord, RecordOrder};

/// Append-only store of extraction records, partitioned by application name.
///
/// No transactions: callers that need at-most-once semantics per
/// (application, file) pair check [`list_completed_file_names`](Self::list_completed_file_names)
/// before inserting.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Append one record.
    async fn insert(&self, record: &ExtractionRecord) -> StoreResult<()>;

    /// All records of an application in the requested order.
    async fn query_by_application(
        &self,
        application_name: &str,
        order: RecordOrder,
    ) -> StoreResult<Vec<ExtractionRecord>>;

    /// Distinct file names that already have a `NEW` record.
    async fn list_completed_file_names(&self, application_name: &str)
        -> StoreResult<BTreeSet<String>>;

    /// Like [`query_by_application`](Self::query_by_application) but a missing
    /// table reads as "no records".
    async fn fetch_records(
        &self,
        application_name: &str,
        order: RecordOrder,
    ) -> StoreResult<Vec<ExtractionRecord>> {
        match self.query_by_application(application_name, order).await {
            Err(StoreError::NotFound(table)) => {
                warn!(
                    backend = self.backend(),
                    table = %table,
                    application = %application_name,
                    "Record table not found, returning no records"
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }
}
