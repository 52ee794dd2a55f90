//! Timestamped records with TTL expiry on top of a raw `Storage`
//!
//! Each key holds one JSON record `{"timestamp": <epoch ms>, "data": ...}`.
//! Records are only ever replaced whole. A record that does not parse is
//! deleted the first time it is read.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::Storage;
use crate::clock::{Clock, SystemClock};

/// Wrapper stored on disk around cached data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// When the record was written, in epoch milliseconds
    pub timestamp: i64,
    /// The cached payload, exactly as it was validated
    pub data: T,
}

/// Freshness of a stored record, as classified by [`CacheStore::lookup`]
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Younger than or exactly as old as the TTL
    Fresh(T),
    /// Older than the TTL but still readable
    Expired(T),
    /// Nothing usable is stored
    Absent,
}

/// Reads and writes cache records
///
/// Cheap to clone; clones share the same storage and clock.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates a store over `storage` stamped by the system clock
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self::with_clock(Arc::new(storage), Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Returns the data for `key` if a record exists and is at most `ttl` old
    ///
    /// An expired record is deleted, so a later `get` with any TTL returns
    /// `None` until the next `set`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        match self.lookup(key, ttl) {
            Lookup::Fresh(data) => Some(data),
            Lookup::Expired(_) => {
                debug!(key, "removing expired cache record");
                self.remove(key);
                None
            }
            Lookup::Absent => None,
        }
    }

    /// Returns whatever data is stored for `key`, regardless of age
    pub fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_record(key).map(|record| record.data)
    }

    /// Classifies the record for `key` without deleting it on expiry
    ///
    /// Unparsable records are still removed.
    pub fn lookup<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Lookup<T> {
        let Some(record) = self.read_record::<T>(key) else {
            return Lookup::Absent;
        };

        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let age = self.now_ms().saturating_sub(record.timestamp);
        if age > ttl_ms {
            Lookup::Expired(record.data)
        } else {
            Lookup::Fresh(record.data)
        }
    }

    /// Writes `data` under `key` stamped with the current time
    ///
    /// Failures are logged and swallowed; the return value reports whether the
    /// record was actually written.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) -> bool {
        let record = CacheRecord {
            timestamp: self.now_ms(),
            data,
        };

        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache record");
                return false;
            }
        };

        match self.storage.write(key, &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "cache write failed, continuing without caching");
                false
            }
        }
    }

    /// Deletes the record for `key`; no-op if absent
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            warn!(key, error = %e, "failed to remove cache record");
        }
    }

    /// Returns the raw record for `key` without any side effects
    pub fn record<T: DeserializeOwned>(&self, key: &str) -> Option<CacheRecord<T>> {
        let raw = self.storage.read(key).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<CacheRecord<T>> {
        let raw = match self.storage.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key, error = %e, "discarding unparsable cache record");
                self.remove(key);
                None
            }
        }
    }
}
