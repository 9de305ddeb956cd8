//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The core
//! crate builds `HttpRequest` values and parses `HttpResponse` values without
//! ever touching the network — the caller (host) is responsible for executing
//! the actual I/O. This keeps path construction and payload shaping
//! deterministic and unit-testable without a live or mocked Nexus deployment.
//!
//! All fields use owned types (`String`, `Vec`) so request values can be
//! handed to any transport without lifetime concerns.

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// An HTTP request described as plain data.
///
/// Built by `ViewsClient::build_*` methods. The `path` is always a complete
/// URL: collection-addressed operations join the client's base URL, while
/// self-addressed operations (update, deprecate, tag) reuse the resource's
/// own `_self` URL verbatim.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// A bodiless request with no extra headers.
    pub fn bare(method: HttpMethod, path: String) -> Self {
        Self {
            method,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A request carrying a JSON payload.
    pub fn json(
        method: HttpMethod,
        path: String,
        body: &serde_json::Value,
    ) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(Self {
            method,
            path,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// A POST carrying a raw SPARQL query string instead of JSON.
    pub fn sparql(path: String, query: &str) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            headers: vec![(
                "content-type".to_string(),
                "application/sparql-query".to_string(),
            )],
            body: Some(query.to_string()),
        }
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the caller after executing an `HttpRequest`, then passed
/// to `ViewsClient::parse_*` methods for status interpretation and
/// deserialization.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}
