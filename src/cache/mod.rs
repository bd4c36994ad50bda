//! Cache Module
//!
//! Cache entries, their expiration policy, and the engine that applies both
//! over a conditional-write key-value store.

mod engine;
mod entry;
mod expiration;


// Re-export public types
pub use engine::{DistributedCache, RefreshOutcome};
pub use entry::{
    decode_row_version, latest_storable_instant, CacheEntry, DecodeError,
    ABSOLUTE_CEILING_ATTRIBUTE, CONTENT_ATTRIBUTE, EXPIRES_AT_ATTRIBUTE, RESERVED_ATTRIBUTES,
    ROW_VERSION_ATTRIBUTE, SLIDING_EXPIRATION_ATTRIBUTE,
};
pub use expiration::{compute_initial_expiry, compute_refreshed_expiry, EntryOptions, InitialExpiry};

// == Public Constants ==
/// Maximum partition key length in bytes accepted by the store
pub const MAX_KEY_LENGTH: usize = 2048;
