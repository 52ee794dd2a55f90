//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portal_cache::{CacheStore, FetchError, Fetcher, Loader, ManualClock, MemoryStorage};

/// Start time for the manual clock, in epoch ms
pub const T0: i64 = 1_700_000_000_000;

/// Fetcher that replays queued responses and counts calls
///
/// Once the queue is empty every call fails with a connect error.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<Value, FetchError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn push_ok(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_err(&self, err: FetchError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(offline(url)))
    }
}

pub fn offline(url: &str) -> FetchError {
    FetchError::Connect {
        url: url.to_string(),
        message: "network unreachable".to_string(),
    }
}

pub struct Harness {
    pub loader: Loader<ScriptedFetcher>,
    pub storage: Arc<MemoryStorage>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_fetcher(ScriptedFetcher::default())
    }

    pub fn with_fetcher(fetcher: ScriptedFetcher) -> Self {
        Self::with_storage(fetcher, MemoryStorage::new())
    }

    pub fn with_storage(fetcher: ScriptedFetcher, storage: MemoryStorage) -> Self {
        let storage = Arc::new(storage);
        let clock = ManualClock::new(T0);
        let store = CacheStore::with_clock(storage.clone(), Arc::new(clock.clone()));
        Self {
            loader: Loader::new(store, fetcher),
            storage,
            clock,
        }
    }

    pub fn fetcher(&self) -> &ScriptedFetcher {
        self.loader.fetcher()
    }

    pub fn store(&self) -> &CacheStore {
        self.loader.store()
    }
}
