//! In-memory record store for testing and development.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::traits::store::RecordStore;
use crate::types::record::{ExtractionRecord, ProcessingStatus, RecordOrder};

/// Vector-backed store. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ExtractionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows across all applications.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Snapshot of every stored row in insertion order.
    pub fn records(&self) -> Vec<ExtractionRecord> {
        self.records.read().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: &ExtractionRecord) -> StoreResult<()> {
        self.records.write().unwrap().push(record.clone());
        Ok(())
    }

    async fn query_by_application(
        &self,
        application_name: &str,
        order: RecordOrder,
    ) -> StoreResult<Vec<ExtractionRecord>> {
        let mut matching: Vec<_> = self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.application_name == application_name)
            .cloned()
            .collect();
        order.sort(&mut matching);
        Ok(matching)
    }

    async fn list_completed_file_names(
        &self,
        application_name: &str,
    ) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| {
                r.application_name == application_name
                    && r.processing_status == ProcessingStatus::New
            })
            .map(|r| r.sql_file_name.clone())
            .collect())
    }
}
