//! Synchronous API client core for the Nexus views service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `ViewsClient` is stateless — it holds only `base_url`. Concurrent
//!   callers share nothing; revision conflicts are the server's to detect.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit and path
//!   construction stays unit-testable.
//! - URL construction lives in `path` as pure functions; every label and
//!   query value is percent-encoded there.
//! - Payloads are JSON-LD snapshots owned by the server; `View` types the
//!   metadata keys and carries the rest in a flattened map.

pub mod client;
pub mod error;
pub mod http;
pub mod path;
pub mod types;

pub use client::{filter_by_type, keep_only_elastic, keep_only_sparql, ViewsClient};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{
    JsonInput, ListOptions, View, ViewListing, DEFAULT_VIEW_TYPES, ELASTIC_TYPE, SPARQL_TYPE,
};
