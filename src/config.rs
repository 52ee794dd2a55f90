//! Runtime configuration derived from the command line
//!
//! `Config` is the validated form of [`Cli`]: the base URL is parsed, the
//! timeout is a `Duration`, and it knows how to build the loader and the
//! three widget resources.

use reqwest::Url;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, FileStorage};
use crate::cli::Cli;
use crate::clock::SystemClock;
use crate::error::ConfigError;
use crate::fetch::HttpFetcher;
use crate::loader::{Loader, Resource};
use crate::resources::{self, AppEntry, NewsArticle, WeatherReport};

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub apps_url: String,
    pub news_url: String,
    pub weather_url: String,
    pub cache_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub log_json: bool,
}

impl Config {
    /// Creates a Config from parsed CLI arguments
    ///
    /// # Errors
    /// * `ConfigError::InvalidBaseUrl` if `--base-url` is not an absolute http(s) URL
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&cli.base_url)?;

        Ok(Self {
            base_url,
            apps_url: cli.apps_url.clone(),
            news_url: cli.news_url.clone(),
            weather_url: cli.weather_url.clone(),
            cache_dir: cli.cache_dir.clone(),
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            log_json: cli.log_json,
        })
    }

    /// Storage at `cache_dir`, or the platform cache directory
    pub fn storage(&self) -> Result<FileStorage, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(FileStorage::with_dir(dir)),
            None => FileStorage::new().ok_or(ConfigError::NoCacheDir),
        }
    }

    /// Builds the loader: file-backed cache and an HTTP fetcher rooted at the base URL
    pub fn loader(&self) -> Result<Loader<HttpFetcher>, ConfigError> {
        let store = CacheStore::with_clock(Arc::new(self.storage()?), Arc::new(SystemClock));
        let fetcher =
            HttpFetcher::with_timeout(self.timeout)?.with_base_url(self.base_url.clone());
        Ok(Loader::new(store, fetcher))
    }

    pub fn apps(&self) -> Result<Resource<Vec<AppEntry>>, ConfigError> {
        Ok(resources::apps(self.apps_url.as_str())?)
    }

    pub fn news(&self) -> Result<Resource<Vec<NewsArticle>>, ConfigError> {
        Ok(resources::news(self.news_url.as_str())?)
    }

    pub fn weather(&self) -> Result<Resource<WeatherReport>, ConfigError> {
        Ok(resources::weather(self.weather_url.as_str())?)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
