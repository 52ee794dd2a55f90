//! Cache-aside loading with stale fallback
//!
//! A load runs through these steps:
//!
//! 1. Unless forced, look the key up in the cache. A fresh record that passes
//!    the validator is returned immediately and no request is made.
//! 2. Otherwise fetch the URL and validate the body. A valid body is written
//!    to the cache and returned.
//! 3. If the fetch or the validation fails, fall back to whatever is stored
//!    for the key regardless of age, provided it still validates.
//! 4. If nothing usable exists, return an empty outcome.
//!
//! `load` never returns an error. Failures show up as `ServedFrom::Stale` or
//! `ServedFrom::None` plus a human-readable notice.
//!
//! Concurrent loads of the same key share one request. The request and its
//! cache write run on a spawned task, so they finish even if every caller
//! that was waiting on them has gone away.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, Lookup};
use crate::error::{FetchError, LoadError, ResourceError};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::validate::Validator;

/// TTL used by [`Loader::cached_get`]
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Key prefix used by [`Loader::cached_get`]
pub const CACHED_GET_PREFIX: &str = "CACHE::GET::";

/// Where the data in a [`LoadOutcome`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedFrom {
    /// A fresh cache record; no request was made
    Cache,
    /// A successful, validated response
    Network,
    /// An expired cache record, served because the request failed
    Stale,
    /// Nothing usable was available
    None,
}

/// Result of a load: the best data available and how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadOutcome<T> {
    pub data: Option<T>,
    pub served_from: ServedFrom,
    /// Why the network result was not used, if it wasn't
    pub notice: Option<String>,
}

impl<T> LoadOutcome<T> {
    fn served(data: T, served_from: ServedFrom) -> Self {
        Self {
            data: Some(data),
            served_from,
            notice: None,
        }
    }

    fn empty(notice: String) -> Self {
        Self {
            data: None,
            served_from: ServedFrom::None,
            notice: Some(notice),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadOutcome<U> {
        LoadOutcome {
            data: self.data.map(f),
            served_from: self.served_from,
            notice: self.notice,
        }
    }
}

/// One cacheable remote resource
///
/// The key is owned by the caller; two resources sharing a key overwrite each
/// other's records.
pub struct Resource<T> {
    key: String,
    url: String,
    ttl: Duration,
    validator: Validator<T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            url: self.url.clone(),
            ttl: self.ttl,
            validator: self.validator.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key)
            .field("url", &self.url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<T> Resource<T> {
    /// Defines a resource
    ///
    /// # Errors
    /// * `ResourceError::EmptyKey` if `key` is empty
    /// * `ResourceError::ZeroTtl` if `ttl` is zero
    pub fn new(
        key: impl Into<String>,
        url: impl Into<String>,
        ttl: Duration,
        validator: Validator<T>,
    ) -> Result<Self, ResourceError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ResourceError::EmptyKey);
        }
        if ttl.is_zero() {
            return Err(ResourceError::ZeroTtl(key));
        }
        Ok(Self {
            key,
            url: url.into(),
            ttl,
            validator,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn validator(&self) -> &Validator<T> {
        &self.validator
    }
}

type PendingFetch = Shared<BoxFuture<'static, Result<Value, LoadError>>>;
type InFlight = Arc<Mutex<HashMap<String, PendingFetch>>>;

/// Serves resources from cache, network or stale cache
///
/// Cheap to clone; clones share the cache and the in-flight table. `load`
/// spawns onto the current tokio runtime.
pub struct Loader<F = HttpFetcher> {
    store: CacheStore,
    fetcher: Arc<F>,
    in_flight: InFlight,
}

impl<F> Clone for Loader<F> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            fetcher: Arc::clone(&self.fetcher),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<F> std::fmt::Debug for Loader<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("in_flight", &lock(&self.in_flight).len())
            .finish_non_exhaustive()
    }
}

impl<F: Fetcher> Loader<F> {
    pub fn new(store: CacheStore, fetcher: F) -> Self {
        Self {
            store,
            fetcher: Arc::new(fetcher),
            in_flight: Arc::default(),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Number of keys with a request currently outstanding
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Loads `resource`, bypassing a fresh cache record when `force` is set
    pub async fn load<T>(&self, resource: &Resource<T>, force: bool) -> LoadOutcome<T>
    where
        T: Send + 'static,
    {
        let key = resource.key();

        if !force {
            match self.store.lookup::<Value>(key, resource.ttl()) {
                Lookup::Fresh(cached) => match resource.validator().check(&cached) {
                    Ok(data) => {
                        debug!(key, "serving from cache");
                        return LoadOutcome::served(data, ServedFrom::Cache);
                    }
                    Err(e) => {
                        warn!(key, error = %e, "cached record failed validation, removing");
                        self.store.remove(key);
                    }
                },
                Lookup::Expired(_) => debug!(key, "cache record expired"),
                Lookup::Absent => debug!(key, "cache miss"),
            }
        }

        let result = match self.pending_fetch(resource).await {
            Ok(value) => resource.validator().check(&value).map_err(LoadError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => LoadOutcome::served(data, ServedFrom::Network),
            Err(e) => self.fall_back(resource, e),
        }
    }

    /// Loads `url` as untyped JSON under the key `CACHE::GET::<url>`
    pub async fn cached_get(&self, url: &str, force: bool) -> LoadOutcome<Value> {
        let resource = Resource {
            key: format!("{}{}", CACHED_GET_PREFIX, url),
            url: url.to_string(),
            ttl: DEFAULT_TTL,
            validator: Validator::any(),
        };
        self.load(&resource, force).await
    }

    /// Drops the cached record for `key`
    pub fn invalidate(&self, key: &str) {
        self.store.remove(key);
    }

    /// Returns the outstanding request for the key, starting one if needed
    fn pending_fetch<T: 'static>(&self, resource: &Resource<T>) -> PendingFetch {
        // Held until the new entry is inserted, so the task cannot remove
        // its entry before it exists.
        let mut in_flight = lock(&self.in_flight);

        if let Some(pending) = in_flight.get(resource.key()) {
            debug!(key = resource.key(), "joining in-flight fetch");
            return pending.clone();
        }

        let key = resource.key().to_string();
        let url = resource.url().to_string();
        let validator = resource.validator().clone();
        let fetcher = Arc::clone(&self.fetcher);
        let store = self.store.clone();
        let registry = Arc::clone(&self.in_flight);

        let task_key = key.clone();
        let task_url = url.clone();
        let task = tokio::spawn(async move {
            let result = fetch_and_store(&*fetcher, &store, &validator, &task_key, &task_url).await;
            lock(&registry).remove(&task_key);
            result
        });

        let pending = async move {
            task.await
                .unwrap_or_else(|_| Err(FetchError::Aborted { url }.into()))
        }
        .boxed()
        .shared();

        in_flight.insert(key, pending.clone());
        pending
    }

    fn fall_back<T>(&self, resource: &Resource<T>, err: LoadError) -> LoadOutcome<T> {
        let key = resource.key();
        let notice = err.to_string();

        let Some(cached) = self.store.get_stale::<Value>(key) else {
            warn!(key, error = %err, "fetch failed and nothing is cached");
            return LoadOutcome::empty(notice);
        };

        match resource.validator().check(&cached) {
            Ok(data) => {
                warn!(key, error = %err, "fetch failed, serving stale cache");
                LoadOutcome {
                    data: Some(data),
                    served_from: ServedFrom::Stale,
                    notice: Some(notice),
                }
            }
            Err(e) => {
                warn!(
                    key,
                    error = %err,
                    stale_error = %e,
                    "fetch failed and stale record is invalid, removing"
                );
                self.store.remove(key);
                LoadOutcome::empty(notice)
            }
        }
    }
}

async fn fetch_and_store<F: Fetcher, T>(
    fetcher: &F,
    store: &CacheStore,
    validator: &Validator<T>,
    key: &str,
    url: &str,
) -> Result<Value, LoadError> {
    let value = fetcher.fetch(url).await?;
    validator.check(&value)?;

    if store.set(key, &value) {
        info!(key, "cached fresh response");
    }
    Ok(value)
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
