//! Placeholder store used when the real backend cannot be reached at startup.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::RecordStore;
use crate::types::record::{ExtractionRecord, RecordOrder};

/// Every operation fails with [`StoreError::Unavailable`]; the pipelines
/// degrade (no dedup, writes skipped) instead of crashing.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RecordStore for UnavailableStore {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn insert(&self, _record: &ExtractionRecord) -> StoreResult<()> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    async fn query_by_application(
        &self,
        _application_name: &str,
        _order: RecordOrder,
    ) -> StoreResult<Vec<ExtractionRecord>> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    async fn list_completed_file_names(
        &self,
        _application_name: &str,
    ) -> StoreResult<BTreeSet<String>> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}
