//! Error types for the views API client.
//!
//! # Design
//! Revision conflicts get a dedicated `StaleRevision` variant because the
//! whole mutation surface runs on optimistic concurrency: callers retry a
//! fetch-modify-update loop on 409 but treat other failures as terminal.
//! `NotFound` is split out for the same reason. Everything else non-2xx lands
//! in `HttpError` with the raw status and body for debugging. The client never
//! retries or recovers locally; every error propagates to the caller.

use std::fmt;

/// Errors returned by `ViewsClient` build and parse methods.
#[derive(Debug)]
pub enum ApiError {
    /// Mutually exclusive arguments were both supplied. Detected before any
    /// request is built.
    InvalidArgument(String),

    /// A JSON-encoded string input could not be parsed, or a payload lacks a
    /// field the operation requires (e.g. a member view without `_project`).
    MalformedInput(String),

    /// The server returned 404 — the requested view does not exist.
    NotFound,

    /// The server returned 409 — the supplied revision no longer matches the
    /// current one. Surfaced as-is; resolution is the caller's business.
    StaleRevision { body: String },

    /// The server returned a non-2xx status other than 404 or 409.
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    SerializationError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            ApiError::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            ApiError::NotFound => write!(f, "view not found"),
            ApiError::StaleRevision { body } => {
                write!(f, "revision conflict: {body}")
            }
            ApiError::HttpError { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            ApiError::DeserializationError(msg) => {
                write!(f, "deserialization failed: {msg}")
            }
            ApiError::SerializationError(msg) => {
                write!(f, "serialization failed: {msg}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
