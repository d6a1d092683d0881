use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::{MedAiError, MedAiResult};

/// Path of the query endpoint, relative to the configured base URL
pub const QUERY_PATH: &str = "/api/v1/query";

/// Path of the liveness endpoint, relative to the configured base URL
pub const HEALTH_CHECK_PATH: &str = "/health-check";

/// Number of passages requested per query
pub const DEFAULT_TOP_K: u32 = 3;

/// Body of `POST /api/v1/query`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// The question typed by the user, already trimmed
    pub query: String,
    /// How many passages the service should retrieve
    pub top_k: u32,
    /// Ask the service to summarize retrieved passages
    pub summarize_context: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            summarize_context: true,
        }
    }
}

/// Successful body of `POST /api/v1/query`.
///
/// Every field is optional on the wire and every field tolerates garbage:
/// a missing or malformed field decodes to its empty value instead of
/// failing the whole payload. `scores` and `metadata` keep one slot per
/// wire element so that index alignment with `contexts` survives a bad entry.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    #[serde(default, deserialize_with = "lenient_answer")]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_contexts")]
    pub contexts: Vec<String>,
    #[serde(default, deserialize_with = "lenient_scores")]
    pub scores: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: Vec<Option<EvidenceMetadata>>,
}

impl QueryResponse {
    /// Decodes a response body.
    ///
    /// Fails only when the body is not JSON at all. Valid JSON that is not an
    /// object carries none of the expected fields and decodes to the defaults.
    pub fn from_json(body: &str) -> MedAiResult<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| MedAiError::ParsingError(format!("Response body is not JSON: {}", e)))?;

        match value {
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Ok(Self::default()),
        }
    }
}

/// Provenance of one retrieved passage
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceMetadata {
    pub source: Option<String>,
    pub title: Option<String>,
    pub page: Option<String>,
    pub section: Option<String>,
}

impl EvidenceMetadata {
    fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            source: field_text(map.get("source")),
            title: field_text(map.get("title")),
            page: field_text(map.get("page")),
            section: field_text(map.get("section")),
        }
    }

    /// True when no field would produce a badge
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.title.is_none() && self.page.is_none() && self.section.is_none()
    }
}

/// Message the service reports from `GET /health-check` once it is serving
pub const LIVE_MESSAGE: &str = "live";

/// Body of `GET /health-check`
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HealthStatus {
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    pub fn is_live(&self) -> bool {
        self.message.trim() == LIVE_MESSAGE
    }
}

// Metadata values come from arbitrary document loaders: pages are often numbers.
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn passage_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_answer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_contexts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().map(passage_text).collect(),
        _ => Vec::new(),
    })
}

fn lenient_scores<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_f64().filter(|score| score.is_finite()))
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<Vec<Option<EvidenceMetadata>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_object().map(EvidenceMetadata::from_object))
            .collect(),
        _ => Vec::new(),
    })
}
