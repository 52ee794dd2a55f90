//! Error types for the cache-then-fetch pipeline
//!
//! None of these cross the `Loader::load` boundary as a failure. Transport and
//! validation errors drive the stale-cache fallback, storage errors are logged
//! and swallowed, and corrupt stored records are deleted on sight.

use thiserror::Error;

/// A network GET that did not produce a decoded JSON body
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The resource URL could not be parsed or resolved against the base URL
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request exceeded the fetcher's timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// DNS, connect or any other transport failure
    #[error("request to {url} failed: {message}")]
    Connect { url: String, message: String },

    /// The server answered with a non-2xx status
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not valid JSON
    #[error("response from {url} is not valid JSON: {message}")]
    Decode { url: String, message: String },

    /// The spawned fetch task died before producing a result
    #[error("fetch task for {url} was aborted")]
    Aborted { url: String },
}

/// A decoded payload that does not have the shape the caller expects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("payload failed validation: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Why a load could not be served from the network
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The persistent medium rejected an operation
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized for writing
    #[error("failed to serialize cache record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The medium is full
    #[error("storage quota exceeded writing '{key}': need {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
}

/// A resource definition that violates the load contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("resource key must not be empty")]
    EmptyKey,

    #[error("resource TTL for '{0}' must be positive")]
    ZeroTtl(String),
}

/// Invalid runtime configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unknown resource '{0}'. Valid resources: apps, news, weather")]
    UnknownResource(String),

    #[error("no cache directory available; pass --cache-dir")]
    NoCacheDir,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}
