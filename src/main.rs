//! Portal cache - fetch portal widget data from the command line
//!
//! Loads, watches, clears or inspects the cached resources behind the
//! portal's app launcher, news feed and weather panel.

use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portal_cache::cli::{Cli, Command};
use portal_cache::config::Config;
use portal_cache::fetch::Fetcher;
use portal_cache::resources::ResourceKind;
use portal_cache::{Loader, RefreshConfig, RefreshHandle, Resource};

/// Installs the log subscriber. Logs go to stderr so stdout stays parseable.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portal_cache=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn load<F, T>(
    loader: &Loader<F>,
    resource: Resource<T>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Fetcher,
    T: Serialize + Send + 'static,
{
    let outcome = loader.load(&resource, force).await;
    print_json(&outcome)
}

async fn watch<F, T>(
    loader: &Loader<F>,
    resource: Resource<T>,
    interval: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Fetcher,
    T: Serialize + Send + Sync + 'static,
{
    let config = RefreshConfig {
        interval: interval.unwrap_or(resource.ttl()),
        enabled: true,
    };
    let mut handle = RefreshHandle::spawn(loader.clone(), resource, config);

    loop {
        tokio::select! {
            alive = handle.changed() => {
                if !alive {
                    break;
                }
                let line = serde_json::to_string(&*handle.view())?;
                println!("{}", line);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn inspect<F: Fetcher>(
    loader: &Loader<F>,
    kind: ResourceKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = loader.store();
    let report = match store.record::<Value>(kind.cache_key()) {
        Some(record) => json!({
            "key": kind.cache_key(),
            "timestamp": record.timestamp,
            "age_ms": store.now_ms() - record.timestamp,
            "data": record.data,
        }),
        None => json!({ "key": kind.cache_key(), "record": null }),
    };
    print_json(&report)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_cli(&cli)?;
    let loader = config.loader()?;

    match cli.command {
        Command::Load { resource, force } => match resource {
            ResourceKind::Apps => load(&loader, config.apps()?, force).await?,
            ResourceKind::News => load(&loader, config.news()?, force).await?,
            ResourceKind::Weather => load(&loader, config.weather()?, force).await?,
        },
        Command::Watch {
            resource,
            interval_secs,
        } => {
            let interval = interval_secs.map(Duration::from_secs);
            match resource {
                ResourceKind::Apps => watch(&loader, config.apps()?, interval).await?,
                ResourceKind::News => watch(&loader, config.news()?, interval).await?,
                ResourceKind::Weather => watch(&loader, config.weather()?, interval).await?,
            }
        }
        Command::Clear { resource } => {
            loader.invalidate(resource.cache_key());
            tracing::info!(resource = %resource, "cache cleared");
        }
        Command::Inspect { resource } => inspect(&loader, resource)?,
    }

    Ok(())
}
