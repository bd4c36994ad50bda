//! distcache - A distributed cache client over a conditional-write key-value store
//!
//! Provides get, set, refresh and remove with absolute and sliding
//! expiration, lazy expiry on read, and optimistic concurrency through the
//! store's conditional put.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{DistributedCache, EntryOptions};
pub use config::{CacheOptions, Config, RowVersioning};
pub use error::{CacheError, Result};
pub use store::{InMemoryStore, KeyValueStore};
