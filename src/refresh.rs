//! Background refresh for a single resource
//!
//! A spawned task owns the load loop and publishes a `ResourceView` over a
//! tokio watch channel. The first load and user-requested refreshes are
//! foreground loads and toggle `loading`. Periodic refreshes are silent: they
//! never touch `loading` or the notice, and they only publish fresh data (or
//! stale data into an empty view), so content that is already on screen is
//! never blanked, downgraded or covered by a spinner.
//!
//! Dropping the handle detaches the observer. A load that is already running
//! still finishes (including its cache write); the task exits afterwards.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::fetch::Fetcher;
use crate::loader::{LoadOutcome, Loader, Resource, ServedFrom};

/// Configuration for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between silent refreshes, independent of the resource TTL
    pub interval: Duration,
    /// Whether periodic refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900), // 15 minutes
            enabled: true,
        }
    }
}

/// What a consumer renders for one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceView<T> {
    /// A foreground load is running
    pub loading: bool,
    /// Last data that was successfully obtained
    pub data: Option<T>,
    pub served_from: ServedFrom,
    pub notice: Option<String>,
}

impl<T> Default for ResourceView<T> {
    fn default() -> Self {
        Self {
            loading: true,
            data: None,
            served_from: ServedFrom::None,
            notice: None,
        }
    }
}

impl<T> ResourceView<T> {
    /// Applies a foreground load. Existing data survives an empty outcome.
    fn apply(&mut self, outcome: LoadOutcome<T>) {
        self.loading = false;
        self.notice = outcome.notice;
        match outcome.data {
            Some(data) => {
                self.data = Some(data);
                self.served_from = outcome.served_from;
            }
            None if self.data.is_none() => self.served_from = outcome.served_from,
            None => {}
        }
    }

    /// Applies a silent load; returns whether anything changed
    ///
    /// Fresh data replaces the view. Stale data only fills an empty view, so a
    /// failed refresh never downgrades what is shown. The notice is left alone.
    fn apply_silent(&mut self, outcome: LoadOutcome<T>) -> bool {
        let Some(data) = outcome.data else {
            return false;
        };
        match outcome.served_from {
            ServedFrom::Network | ServedFrom::Cache => {}
            ServedFrom::Stale if self.data.is_none() => {}
            ServedFrom::Stale | ServedFrom::None => return false,
        }
        self.data = Some(data);
        self.served_from = outcome.served_from;
        true
    }
}

enum Command {
    RefreshNow,
    Shutdown,
}

/// Handle to a running refresh loop
pub struct RefreshHandle<T> {
    view: watch::Receiver<ResourceView<T>>,
    control: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl<T> RefreshHandle<T>
where
    T: Send + Sync + 'static,
{
    /// Spawns the refresh loop for `resource`
    ///
    /// The first load starts immediately. Must be called inside a tokio runtime.
    pub fn spawn<F: Fetcher>(
        loader: Loader<F>,
        resource: Resource<T>,
        config: RefreshConfig,
    ) -> Self {
        let (view_tx, view_rx) = watch::channel(ResourceView::default());
        let (control_tx, control_rx) = mpsc::channel(8);

        let task = tokio::spawn(run(loader, resource, config, view_tx, control_rx));

        Self {
            view: view_rx,
            control: control_tx,
            task,
        }
    }

    /// Borrows the current view
    pub fn view(&self) -> watch::Ref<'_, ResourceView<T>> {
        self.view.borrow()
    }

    /// Another receiver for the same view
    pub fn subscribe(&self) -> watch::Receiver<ResourceView<T>> {
        self.view.clone()
    }

    /// Waits for the next published view
    ///
    /// Returns `false` once the refresh loop has stopped.
    pub async fn changed(&mut self) -> bool {
        self.view.changed().await.is_ok()
    }

    /// Requests a forced, foreground reload
    pub async fn refresh_now(&self) {
        let _ = self.control.send(Command::RefreshNow).await;
    }

    /// Stops the loop and waits for it to finish any running load
    pub async fn shutdown(self) {
        let _ = self.control.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

async fn run<F, T>(
    loader: Loader<F>,
    resource: Resource<T>,
    config: RefreshConfig,
    view: watch::Sender<ResourceView<T>>,
    mut control: mpsc::Receiver<Command>,
) where
    F: Fetcher,
    T: Send + Sync + 'static,
{
    let key = resource.key().to_string();

    let outcome = loader.load(&resource, false).await;
    view.send_modify(|v| v.apply(outcome));

    let periodic = config.enabled && !config.interval.is_zero();
    let mut interval = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the first tick (immediate)
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick(), if periodic => {
                debug!(key = %key, "silent refresh");
                let outcome = loader.load(&resource, false).await;
                view.send_if_modified(|v| v.apply_silent(outcome));
            }
            command = control.recv() => match command {
                Some(Command::RefreshNow) => {
                    debug!(key = %key, "forced refresh");
                    view.send_modify(|v| v.loading = true);
                    let outcome = loader.load(&resource, true).await;
                    view.send_modify(|v| v.apply(outcome));
                }
                Some(Command::Shutdown) | None => break,
            }
        }
    }

    debug!(key = %key, "refresh loop stopped");
}
