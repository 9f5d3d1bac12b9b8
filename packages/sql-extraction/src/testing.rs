//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipelines without a hosted model or a
//! real analytical store.

use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{AuthError, ModelError, ModelResult, StoreError, StoreResult};
use crate::stores::memory::MemoryStore;
use crate::traits::{auth::AccessTokenSource, model::LanguageModel, store::RecordStore};
use crate::types::record::{ExtractionRecord, RecordOrder};

/// A mock language model.
///
/// Answers come from, in order: the first rule whose needle appears in the
/// prompt, the scripted queue, then the default response.
#[derive(Default)]
pub struct MockModel {
    /// (needle, answer) pairs matched against the prompt
    rules: Arc<RwLock<Vec<(String, ModelResult<String>)>>>,

    /// Answers consumed one per call
    script: Arc<RwLock<VecDeque<ModelResult<String>>>>,

    /// Fallback answer
    default_response: Option<String>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub struct MockModelCall {
    pub system: String,
    pub prompt: String,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every otherwise unmatched call with `response`.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Queue a response for the next unmatched call.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.script.write().unwrap().push_back(Ok(response.into()));
        self
    }

    /// Queue a failure for the next unmatched call.
    pub fn with_failure(self, error: ModelError) -> Self {
        self.script.write().unwrap().push_back(Err(error));
        self
    }

    /// Answer any prompt containing `needle` with `response`.
    pub fn with_response_for(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((needle.into(), Ok(response.into())));
        self
    }

    /// Fail any prompt containing `needle`.
    pub fn with_failure_for(self, needle: impl Into<String>, error: ModelError) -> Self {
        self.rules.write().unwrap().push((needle.into(), Err(error)));
        self
    }

    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn was_called_with(&self, needle: &str) -> bool {
        self.calls
            .read()
            .unwrap()
            .iter()
            .any(|call| call.prompt.contains(needle))
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, system: &str, prompt: &str) -> ModelResult<String> {
        self.calls.write().unwrap().push(MockModelCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        if let Some((_, answer)) = self
            .rules
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
        {
            return answer.clone();
        }

        if let Some(answer) = self.script.write().unwrap().pop_front() {
            return answer;
        }

        self.default_response
            .clone()
            .ok_or_else(|| ModelError::Call("mock model has no response configured".to_string()))
    }
}

/// A store that fails selected operations and delegates the rest to a
/// [`MemoryStore`].
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    insert_error: Option<StoreError>,
    query_error: Option<StoreError>,
    list_error: Option<StoreError>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert(mut self, error: StoreError) -> Self {
        self.insert_error = Some(error);
        self
    }

    pub fn failing_query(mut self, error: StoreError) -> Self {
        self.query_error = Some(error);
        self
    }

    pub fn failing_list(mut self, error: StoreError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Records that made it through to the inner store.
    pub fn records(&self) -> Vec<ExtractionRecord> {
        self.inner.records()
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn insert(&self, record: &ExtractionRecord) -> StoreResult<()> {
        match &self.insert_error {
            Some(e) => Err(e.clone()),
            None => self.inner.insert(record).await,
        }
    }

    async fn query_by_application(
        &self,
        application_name: &str,
        order: RecordOrder,
    ) -> StoreResult<Vec<ExtractionRecord>> {
        match &self.query_error {
            Some(e) => Err(e.clone()),
            None => self.inner.query_by_application(application_name, order).await,
        }
    }

    async fn list_completed_file_names(
        &self,
        application_name: &str,
    ) -> StoreResult<BTreeSet<String>> {
        match &self.list_error {
            Some(e) => Err(e.clone()),
            None => self.inner.list_completed_file_names(application_name).await,
        }
    }
}

/// Token source that numbers its tokens (`token-1`, `token-2`, ...) or fails.
#[derive(Default)]
pub struct MockTokenSource {
    issued: AtomicUsize,
    error: Option<AuthError>,
}

impl MockTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: AuthError) -> Self {
        Self {
            issued: AtomicUsize::new(0),
            error: Some(error),
        }
    }

    /// Number of tokens requested so far.
    pub fn call_count(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenSource for MockTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(format!("token-{n}")),
        }
    }
}
