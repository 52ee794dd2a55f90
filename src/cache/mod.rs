//! Persistent cache store for fetched JSON resources
//!
//! Records carry the time they were written and are checked against a TTL
//! on read. Expired records stay readable through `get_stale` (until a plain
//! `get` deletes them), which is what lets a load fall back to old data
//! when the network is down.

mod storage;
mod store;

pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{CacheRecord, CacheStore, Lookup};
