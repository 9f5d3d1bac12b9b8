use std::collections::HashMap;
use std::env;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use sql_extraction::PromptConfig;
use thiserror::Error;

/// Prefix for environment overrides (`APP_PROJECT_ID`, `APP_PROMPT__REPORT`).
pub const ENV_PREFIX: &str = "APP";

/// File read when `CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where extraction records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Bigquery,
    Postgres,
    Memory,
}

/// Service settings, built once at startup and passed down explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub project_id: String,
    pub region: String,

    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub bigquery_access_token: Option<String>,

    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Log full prompts and responses at debug level
    pub run_agent_with_debug: bool,

    pub rag_default_top_k: u32,
    pub rag_default_search_top_k: u32,
    pub rag_default_vector_distance_threshold: f64,

    #[serde(default)]
    pub prompt: PromptConfig,
}

fn default_dataset() -> String {
    "gdm".to_string()
}

fn default_table() -> String {
    "raw_sql_extracts".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    300
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.9
}

fn default_port() -> u16 {
    8000
}

impl Settings {
    /// Load from `.env`, the YAML file and `APP_` variables, in increasing
    /// precedence.
    ///
    /// The YAML file is `CONFIG_PATH` when set (and must then exist), otherwise
    /// an optional `config.yaml` in the working directory.
    pub fn load() -> Result<Self, SettingsError> {
        let _ = dotenvy::dotenv();

        let (path, required) = match env::var("CONFIG_PATH") {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };

        let config = Config::builder()
            .add_source(File::new(&path, FileFormat::Yaml).required(required))
            .add_source(environment())
            .build()?;

        Self::finish(config)
    }

    /// Build from an inline YAML document and an explicit variable map.
    pub fn from_sources(
        yaml: Option<&str>,
        vars: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(yaml) = yaml {
            builder = builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        }
        let config = builder
            .add_source(environment().source(Some(vars)))
            .build()?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.project_id.trim().is_empty() {
            return Err(invalid("project_id must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(invalid("region must not be empty"));
        }
        if self.rag_default_top_k == 0 {
            return Err(invalid("rag_default_top_k must be greater than 0"));
        }
        if self.rag_default_search_top_k == 0 {
            return Err(invalid("rag_default_search_top_k must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.rag_default_vector_distance_threshold) {
            return Err(invalid(
                "rag_default_vector_distance_threshold must be between 0 and 1",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("temperature must be between 0 and 2"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(invalid("top_p must be between 0 and 1"));
        }
        if self.llm_timeout_secs == 0 {
            return Err(invalid("llm_timeout_secs must be greater than 0"));
        }
        if self.store_backend == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(invalid("database_url is required for the postgres backend"));
        }

        Ok(())
    }

    /// Chat completions root: `llm_base_url`, or the Vertex AI OpenAI-compatible
    /// endpoint for this project and region.
    pub fn llm_endpoint(&self) -> String {
        match &self.llm_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{region}-aiplatform.googleapis.com/v1beta1/projects/{project}/locations/{region}/endpoints/openapi",
                region = self.region,
                project = self.project_id,
            ),
        }
    }

    /// Model id as sent on the wire. Vertex AI wants a publisher prefix.
    pub fn llm_model_id(&self) -> String {
        if self.llm_base_url.is_none() && !self.llm_model.contains('/') {
            format!("google/{}", self.llm_model)
        } else {
            self.llm_model.clone()
        }
    }

    /// Static API key for the model endpoint, when one is configured.
    pub fn llm_credential(&self) -> Option<&str> {
        self.llm_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Fixed Google Cloud access token. Without one, Application Default
    /// Credentials are used and refreshed automatically.
    pub fn google_access_token(&self) -> Option<&str> {
        self.bigquery_access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Whether anything needs Google credentials.
    pub fn uses_google_auth(&self) -> bool {
        self.store_backend == StoreBackend::Bigquery || self.llm_credential().is_none()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn invalid(message: &str) -> SettingsError {
    SettingsError::Invalid(message.to_string())
}
