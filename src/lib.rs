//! Portal cache library
//!
//! Cache-then-fetch access to JSON resources: fresh cache records are served
//! without touching the network, fresh responses are validated before they
//! are cached, and when a fetch fails the last valid record is served instead.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod refresh;
pub mod resources;
pub mod validate;

pub use cache::{CacheRecord, CacheStore, FileStorage, MemoryStorage, Storage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, FetchError, LoadError, ResourceError, StorageError, ValidationError};
pub use fetch::{Fetcher, HttpFetcher};
pub use loader::{LoadOutcome, Loader, Resource, ServedFrom};
pub use refresh::{RefreshConfig, RefreshHandle, ResourceView};
pub use validate::Validator;
