//! Resource payloads for the views API.
//!
//! # Design
//! Nexus payloads are JSON-LD with a handful of well-known metadata keys
//! (`@id`, `@type`, `_self`, `_rev`, ...) next to a free-form, type-specific
//! body (an indexing mapping for ElasticSearch views, member references for
//! aggregates). `View` types the metadata and keeps the rest in a flattened
//! map so payloads round-trip through update calls unmodified. The same type
//! serves full fetch results and the metadata-only payloads mutations return.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Type tag carried by ElasticSearch-backed views.
pub const ELASTIC_TYPE: &str = "ElasticView";

/// Type tag carried by SPARQL-backed views.
pub const SPARQL_TYPE: &str = "SparqlView";

/// Type tags injected into a create payload that carries none.
pub const DEFAULT_VIEW_TYPES: [&str; 3] = ["View", ELASTIC_TYPE, "Alpha"];

/// A view payload as returned by the server.
///
/// Every instance is a snapshot: the client never owns or mutates views, it
/// only ships them back and forth. `_project` is absent from metadata-only
/// responses and present on full fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type", default)]
    pub types: Vec<String>,

    /// Canonical URL of this view; used verbatim by self-addressed
    /// operations (update, deprecate, tag).
    #[serde(rename = "_self")]
    pub self_url: String,

    #[serde(rename = "_rev")]
    pub rev: u64,

    #[serde(rename = "_deprecated", default)]
    pub deprecated: bool,

    #[serde(rename = "_project", default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Type-specific body fields, preserved as-is.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl View {
    /// Whether this view carries the given type tag.
    pub fn has_type(&self, type_tag: &str) -> bool {
        self.types.iter().any(|t| t == type_tag)
    }
}

/// One page of a listing: metadata payloads plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewListing {
    #[serde(rename = "_total", default)]
    pub total: u64,

    #[serde(rename = "_results", default)]
    pub results: Vec<View>,
}

/// A JSON body supplied either as structured data or as encoded text.
///
/// Operations accepting either form resolve the input exactly once, at the
/// boundary, so the rest of the pipeline only ever sees `Value`.
#[derive(Debug, Clone)]
pub enum JsonInput {
    Structured(Value),
    Text(String),
}

impl JsonInput {
    /// Resolve into a single structured form, parsing text variants.
    pub fn resolve(self) -> Result<Value, ApiError> {
        match self {
            JsonInput::Structured(value) => Ok(value),
            JsonInput::Text(text) => {
                serde_json::from_str(&text).map_err(|e| ApiError::MalformedInput(e.to_string()))
            }
        }
    }
}

impl From<Value> for JsonInput {
    fn from(value: Value) -> Self {
        JsonInput::Structured(value)
    }
}

impl From<String> for JsonInput {
    fn from(text: String) -> Self {
        JsonInput::Text(text)
    }
}

impl From<&str> for JsonInput {
    fn from(text: &str) -> Self {
        JsonInput::Text(text.to_string())
    }
}

/// Pagination and filtering options for listing views.
///
/// `deprecated` is tri-state: `None` returns both deprecated and live views,
/// `Some(true)` / `Some(false)` filter accordingly.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub from: u64,
    pub size: u64,
    pub deprecated: Option<bool>,
    pub type_filter: Option<String>,
    pub full_text_query: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            from: 0,
            size: 20,
            deprecated: None,
            type_filter: None,
            full_text_query: None,
        }
    }
}
