//! Server dependencies (using traits for testability)
//!
//! The record store and the language model sit behind trait objects so the
//! HTTP layer and the batch binary can run against mocks in tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use openai_client::OpenAIClient;
use sql_extraction::{
    AccessTokenSource, AuthError, BigQueryConfig, BigQueryStore, Consolidator, Extractor,
    GoogleAuth, LanguageModel, MemoryStore, OpenAIModel, PostgresStore, RecordStore,
    StaticToken, StoreError, UnavailableStore,
};
use tracing::{info, warn};

use crate::config::{Settings, StoreBackend};

/// Shared clients for request handlers.
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn RecordStore>,
    pub model: Arc<dyn LanguageModel>,
    pub extractor: Arc<Extractor>,
    pub consolidator: Arc<Consolidator>,
}

impl ServerDeps {
    /// Wire the pipelines over an existing store and model.
    pub fn new(
        store: Arc<dyn RecordStore>,
        model: Arc<dyn LanguageModel>,
        settings: &Settings,
    ) -> Self {
        let extractor = Extractor::new(store.clone(), model.clone())
            .with_prompts(settings.prompt.clone())
            .with_debug(settings.run_agent_with_debug);
        let consolidator = Consolidator::new(store.clone(), model.clone())
            .with_debug(settings.run_agent_with_debug);

        Self {
            store,
            model,
            extractor: Arc::new(extractor),
            consolidator: Arc::new(consolidator),
        }
    }

    /// Build the configured store and model.
    ///
    /// A store that cannot be constructed is replaced by an
    /// [`UnavailableStore`] so the service still starts; a model without
    /// credentials is fatal.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let google = if settings.uses_google_auth() {
            Some(google_tokens(settings).await)
        } else {
            None
        };

        let store = match build_store(settings, google.clone()).await {
            Ok(store) => {
                info!(backend = store.backend(), "Record store ready");
                store
            }
            Err(e) => {
                warn!(error = %e, "Record store unavailable, continuing without persistence");
                Arc::new(UnavailableStore::new(e.to_string()))
            }
        };

        let model = build_model(settings, google)?;
        info!(model = model.model_name(), endpoint = %settings.llm_endpoint(), "Language model ready");

        Ok(Self::new(store, model, settings))
    }
}

type TokenResult = Result<Arc<dyn AccessTokenSource>, AuthError>;

/// The fixed token override, or Application Default Credentials.
async fn google_tokens(settings: &Settings) -> TokenResult {
    match settings.google_access_token() {
        Some(token) => {
            warn!("Using a fixed Google access token; it will not be refreshed");
            Ok(Arc::new(StaticToken::new(token)?))
        }
        None => Ok(Arc::new(GoogleAuth::discover().await?)),
    }
}

async fn build_store(
    settings: &Settings,
    google: Option<TokenResult>,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    match settings.store_backend {
        StoreBackend::Bigquery => {
            let tokens = google.unwrap_or_else(|| {
                Err(AuthError::Unavailable("Google credentials were not resolved".into()))
            })?;
            let config = BigQueryConfig::new(&settings.project_id, &settings.dataset, &settings.table);
            Ok(Arc::new(BigQueryStore::new(config, tokens)?))
        }
        StoreBackend::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("database_url is not set".into()))?;
            Ok(Arc::new(PostgresStore::new(url).await?))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

fn build_model(settings: &Settings, google: Option<TokenResult>) -> Result<Arc<dyn LanguageModel>> {
    let client = OpenAIClient::new(settings.llm_credential().unwrap_or_default())
        .with_base_url(settings.llm_endpoint())
        .with_timeout(Duration::from_secs(settings.llm_timeout_secs))
        .context("Failed to build model client")?;

    let mut model = OpenAIModel::new(client, settings.llm_model_id())
        .with_temperature(settings.temperature)
        .with_top_p(settings.top_p);

    if settings.llm_credential().is_none() {
        let tokens = google
            .context("llm_api_key or Google credentials must be configured")?
            .context("No credentials for the model endpoint; set llm_api_key or configure Application Default Credentials")?;
        model = model.with_token_source(tokens);
    }

    Ok(Arc::new(model))
}
