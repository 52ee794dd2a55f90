//! Command-line interface parsing for portal-cache
//!
//! Every endpoint and path can also be set through `PORTAL_*` environment
//! variables, so deployments configure the binary the same way the portal
//! front end is configured.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::resources::{weather, ResourceKind};

/// Portal cache - fetch portal widget data with caching and offline fallback
#[derive(Parser, Debug)]
#[command(name = "portal-cache")]
#[command(about = "Cached, validated access to the portal's widget data")]
#[command(version)]
pub struct Cli {
    /// Base URL that relative resource URLs are resolved against
    #[arg(long, env = "PORTAL_API_BASE_URL", default_value = "https://teso.mn")]
    pub base_url: String,

    /// App launcher endpoint
    #[arg(long, env = "PORTAL_APPS_URL", default_value = "/api/systems")]
    pub apps_url: String,

    /// News feed endpoint
    #[arg(long, env = "PORTAL_NEWS_URL", default_value = "/_next/data/news.json")]
    pub news_url: String,

    /// Weather forecast endpoint
    #[arg(long, env = "PORTAL_WEATHER_URL", default_value = weather::DEFAULT_URL)]
    pub weather_url: String,

    /// Directory for cache records (defaults to the platform cache directory)
    #[arg(long, env = "PORTAL_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a resource once and print the outcome as JSON
    Load {
        /// apps, news or weather
        #[arg(value_parser = parse_resource_arg)]
        resource: ResourceKind,

        /// Skip a fresh cache record and always hit the network
        #[arg(long)]
        force: bool,
    },

    /// Keep a resource refreshed in the background and print every update
    Watch {
        /// apps, news or weather
        #[arg(value_parser = parse_resource_arg)]
        resource: ResourceKind,

        /// Seconds between silent refreshes (defaults to the resource TTL)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Delete the cached record for a resource
    Clear {
        #[arg(value_parser = parse_resource_arg)]
        resource: ResourceKind,
    },

    /// Print the stored record for a resource without modifying it
    Inspect {
        #[arg(value_parser = parse_resource_arg)]
        resource: ResourceKind,
    },
}

/// Parses a resource name argument
///
/// # Returns
/// * `Ok(ResourceKind)` if the string names a known resource
/// * `Err(ConfigError::UnknownResource)` otherwise
pub fn parse_resource_arg(s: &str) -> Result<ResourceKind, ConfigError> {
    s.parse()
}
