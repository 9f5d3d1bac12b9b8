//! Typed views over model output.
//!
//! The model's JSON is persisted verbatim; these types are how the pipeline and
//! the renderers read it. Every field is lenient about `null` and missing
//! values since the shape comes from a language model, not a schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::record::ProcessingStatus;

/// Treat `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Scalar as text; anything else is absent.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Names may arrive as `null` or as numbers.
fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)
        .map(scalar_text)?
        .unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(scalar_text)
}

/// A list of strings, a single string, or nothing.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

/// Keep the elements that read as `T` and drop the rest.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// `Some(T)` when the value reads as `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// Accept `true`, `"true"`, `"YES"`, `"NULL"` and friends.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "null" | "nullable" => Some(true),
            "false" | "no" | "n" | "not null" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Job-level metadata the model reads from comments or commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(default, deserialize_with = "lenient_text")]
    pub job_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub default_database: Option<String>,
}

/// A column of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(
        default,
        alias = "name",
        alias = "column_name",
        deserialize_with = "lenient_name"
    )]
    pub attribute_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub data_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_nullable: Option<bool>,
}

/// A table or view inferred from the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(
        default,
        alias = "name",
        alias = "table_name",
        deserialize_with = "lenient_name"
    )]
    pub entity_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub database: Option<String>,
    #[serde(default, alias = "entity_type", deserialize_with = "lenient_text")]
    pub entity_role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub creation_source: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub primary_key: Vec<String>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub attributes: Vec<Attribute>,
}

impl Entity {
    pub fn role(&self) -> Option<EntityRole> {
        self.entity_role.as_deref().map(EntityRole::classify)
    }
}

/// Role classification of an entity within a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    Source,
    Target,
    Work,
    Lookup,
    Other(String),
}

impl EntityRole {
    /// Classify the free-text role label the model emits (`SOURCE_TABLE`, `Target`, ...).
    pub fn classify(label: &str) -> Self {
        let upper = label.trim().to_ascii_uppercase();
        if upper.contains("SOURCE") {
            Self::Source
        } else if upper.contains("TARGET") {
            Self::Target
        } else if upper.contains("WORK") || upper.contains("VOLATILE") || upper.contains("TEMP") {
            Self::Work
        } else if upper.contains("LOOKUP") {
            Self::Lookup
        } else {
            Self::Other(label.trim().to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
            Self::Work => "work",
            Self::Lookup => "lookup",
            Self::Other(label) => label,
        }
    }
}

/// A join between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub join_type: Option<String>,
    #[serde(default, alias = "from", deserialize_with = "lenient_name")]
    pub left_entity: String,
    #[serde(default, alias = "to", deserialize_with = "lenient_name")]
    pub right_entity: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub join_conditions: Vec<String>,
}

/// Column-level mapping inside a data flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMapping {
    #[serde(default, deserialize_with = "lenient_name")]
    pub target_attribute: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub source_attributes: Vec<String>,
    #[serde(default, alias = "transformation", deserialize_with = "lenient_text")]
    pub source_expression: Option<String>,
}

/// Source-to-target lineage from an INSERT/UPDATE/MERGE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub operation_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_name")]
    pub target_entity: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub source_entities: Vec<String>,
    #[serde(default, alias = "mappings", deserialize_with = "lenient_seq")]
    pub attribute_mappings: Vec<AttributeMapping>,
}

/// The structured data model extracted from one script.
///
/// Reading is best-effort: fields and list elements that do not fit are
/// dropped from the typed view, while the raw JSON keeps them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    #[serde(default, deserialize_with = "lenient")]
    pub job_metadata: Option<JobMetadata>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub entities: Vec<Entity>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub relationships: Vec<Relationship>,
    #[serde(default, alias = "lineage", deserialize_with = "lenient_seq")]
    pub data_flow: Vec<DataFlow>,
}

impl DataModel {
    /// Read a data model out of a JSON value; only objects qualify.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(serde::de::Error::custom(format!(
                "expected a JSON object, found {}",
                json_kind(value)
            )));
        }
        Ok(Self::deserialize(value).unwrap_or_default())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Payload recorded when a model response is not a usable data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub error: String,
    pub details: String,
    pub response_text: String,
}

impl ParseFailure {
    pub const INVALID_JSON: &'static str = "Invalid JSON response from model";

    pub fn invalid_json(details: impl Into<String>, response_text: impl Into<String>) -> Self {
        Self {
            error: Self::INVALID_JSON.to_string(),
            details: details.into(),
            response_text: response_text.into(),
        }
    }
}

/// Either a parsed data model or the failure payload that replaces it.
///
/// `Model` keeps the JSON exactly as the model produced it so persistence never
/// rewrites what was returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserOutput {
    Model { model: DataModel, raw: Value },
    Failed(ParseFailure),
}

impl ParserOutput {
    /// Parse already-unwrapped response text.
    pub fn from_response_text(text: &str) -> Self {
        let raw: Value = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => return Self::Failed(ParseFailure::invalid_json(e.to_string(), text)),
        };

        match DataModel::from_value(&raw) {
            Ok(model) => Self::Model { model, raw },
            Err(e) => Self::Failed(ParseFailure::invalid_json(e.to_string(), text)),
        }
    }

    /// Interpret a persisted `parser_output` value.
    pub fn from_stored(value: &Value) -> Self {
        if let Ok(failure) = ParseFailure::deserialize(value) {
            return Self::Failed(failure);
        }

        match DataModel::from_value(value) {
            Ok(model) => Self::Model {
                model,
                raw: value.clone(),
            },
            Err(e) => Self::Failed(ParseFailure {
                error: "Stored output is not a data model".to_string(),
                details: e.to_string(),
                response_text: value.to_string(),
            }),
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        match self {
            Self::Model { .. } => ProcessingStatus::New,
            Self::Failed(_) => ProcessingStatus::Error,
        }
    }

    pub fn model(&self) -> Option<&DataModel> {
        match self {
            Self::Model { model, .. } => Some(model),
            Self::Failed(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Model { raw, .. } => raw.clone(),
            Self::Failed(failure) => serde_json::json!({
                "error": failure.error,
                "details": failure.details,
                "response_text": failure.response_text,
            }),
        }
    }
}

/// Entity reference inside a consolidated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedEntity {
    #[serde(default, alias = "entity_name", deserialize_with = "lenient_name")]
    pub name: String,
}

/// Relationship inside a consolidated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRelationship {
    #[serde(default, alias = "left_entity")]
    pub from: String,
    #[serde(default, alias = "right_entity")]
    pub to: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Reduced entities/relationships model produced by the merge prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedModel {
    #[serde(default, deserialize_with = "nullable")]
    pub entities: Vec<ConsolidatedEntity>,
    #[serde(default, deserialize_with = "nullable")]
    pub relationships: Vec<ConsolidatedRelationship>,
}
