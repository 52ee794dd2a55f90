//! Network side of a load: GET a URL and decode the JSON body
//!
//! The fetcher does not judge the payload's shape; that is the validator's
//! job. It only guarantees that a returned value came from a 2xx response
//! within the timeout.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// Bound on every GET issued by [`HttpFetcher`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Issues GETs for JSON resources
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}

/// Fetches over HTTP(S) with reqwest
///
/// URLs may be absolute or relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    /// Create a fetcher with the default 15 second timeout
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Create a fetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Resolve relative URLs against `base_url`
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Turns `url` into an absolute http(s) URL
    pub fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let resolved = match (Url::parse(url), &self.base_url) {
            (Ok(absolute), _) => absolute,
            (Err(_), Some(base)) => base.join(url).map_err(|e| invalid(e.to_string()))?,
            (Err(e), None) => return Err(invalid(e.to_string())),
        };

        match resolved.scheme() {
            "http" | "https" => Ok(resolved),
            other => Err(invalid(format!("unsupported scheme '{}'", other))),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let resolved = self.resolve(url)?;
        let target = resolved.to_string();
        debug!(url = %target, "fetching");

        let response = self
            .client
            .get(resolved)
            .send()
            .await
            .map_err(|e| transport_error(&target, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target,
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&target, e))?;

        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: target,
            message: e.to_string(),
        })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Connect {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
