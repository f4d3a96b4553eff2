//! Error types for the sync core.
//!
//! # Design
//! `ApiError` describes failures at the service boundary (building a request
//! or interpreting a response). `SyncError` is what callers of the engine
//! see: it is carried inside `FetchResult` and never raised past `perform`.
//! Every non-2xx status collapses to `SyncError::FetchFailed` so callers do
//! not branch on 4xx versus 5xx.

use thiserror::Error;

use crate::engine::SyncMethod;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected schema.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Errors reported through `FetchResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Offline and the request cannot be served from the local store.
    #[error("operation not supported offline")]
    UnsupportedOffline { method: SyncMethod },

    /// The service answered with a non-2xx status.
    #[error("failed to fetch data")]
    FetchFailed { status: u16 },

    /// The round-trip itself failed; carries the transport's message.
    #[error("{0}")]
    Transport(String),

    /// The service answered 2xx with a body that failed validation.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, .. } => SyncError::FetchFailed { status },
            ApiError::InvalidBody(msg) => SyncError::InvalidResponse(msg),
            ApiError::Serialization(msg) => SyncError::InvalidRequest(msg),
        }
    }
}

/// A failed HTTP round-trip (DNS, connect, TLS, reset, ...).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The connectivity prober could not answer.
#[derive(Debug, Clone, Error)]
#[error("connectivity probe failed: {0}")]
pub struct ProbeError(pub String);

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be true or false, got {value:?}")]
    InvalidBool { name: &'static str, value: String },

    #[error("base url must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}
