//! Cache Engine
//!
//! The distributed cache contract (get, set, refresh, remove) implemented
//! over a [`KeyValueStore`]. The engine keeps no per-key state in process;
//! concurrent writers are ordered by the store's conditional put.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::entry::{decode_row_version, ROW_VERSION_ATTRIBUTE};
use crate::cache::expiration::{compute_initial_expiry, compute_refreshed_expiry, EntryOptions};
use crate::cache::CacheEntry;
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheOptions, RowVersioning};
use crate::error::{CacheError, Result};
use crate::store::{KeyValueStore, PutCondition, StoreError};

// == Refresh Outcome ==
/// What the read path did about an entry's sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The extended expiry was written
    Updated,
    /// No write was needed: no entry, no window, or already expired
    SkippedNotNeeded,
    /// Another writer changed the row first; the refresh was dropped
    LostRace,
}

// == Distributed Cache ==
/// Cache client over a conditional-write key-value store.
///
/// Cheap to clone; clones share the store and clock.
#[derive(Clone)]
pub struct DistributedCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    options: Arc<CacheOptions>,
}

impl DistributedCache {
    // == Constructors ==
    /// Creates a cache using the system clock.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] if `options` fail validation.
    pub fn new(store: Arc<dyn KeyValueStore>, options: CacheOptions) -> Result<Self> {
        Self::with_clock(store, options, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        options: CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            store,
            clock,
            options: Arc::new(options),
        })
    }

    /// The validated options this cache runs with.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    // == Get ==
    /// Returns the content stored under `key`, or `None` if the key is
    /// absent or expired. A hit extends the entry's sliding window.
    pub async fn get(&self, key: &str, cancel: &CancellationToken) -> Result<Option<Vec<u8>>> {
        let (entry, _) = self.fetch_and_maybe_refresh(key, cancel).await?;
        Ok(entry.map(|e| e.content))
    }

    // == Set ==
    /// Stores `content` under `key`, replacing any existing entry.
    ///
    /// # Errors
    /// - [`CacheError::InvalidExpiration`] before any store call if the
    ///   requested expiration is unusable
    /// - [`CacheError::WriteConflict`] if a concurrent writer changed the
    ///   row between this call's read and write; not retried
    pub async fn set(
        &self,
        key: &str,
        content: Vec<u8>,
        options: &EntryOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel)?;
        let now = self.clock.now();
        let expiry =
            compute_initial_expiry(options, self.options.default_sliding_expiration, now)?;

        let observed = match self.options.row_versioning {
            RowVersioning::Fixed => None,
            RowVersioning::Incrementing => self.read_row_version(key, cancel).await?,
        };

        let entry = CacheEntry {
            key: key.to_string(),
            content,
            expires_at: expiry.expires_at,
            sliding_expiration: Some(expiry.sliding_expiration),
            absolute_ceiling: expiry.absolute.filter(|_| self.options.enforce_absolute_ceiling),
            row_version: self.next_version(observed),
        };

        ensure_active(cancel)?;
        match self.persist(&entry, observed).await {
            Ok(()) => {
                debug!(key, version = entry.row_version, expires_at = %entry.expires_at, "cache set");
                Ok(())
            }
            Err(err) => {
                if matches!(err, CacheError::WriteConflict { .. }) {
                    warn!(key, ?observed, "cache set lost to a concurrent writer");
                }
                Err(err)
            }
        }
    }

    // == Refresh ==
    /// Extends the sliding window of `key` without returning its content.
    /// Absent or expired keys are left alone.
    pub async fn refresh(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        self.fetch_and_maybe_refresh(key, cancel).await?;
        Ok(())
    }

    // == Remove ==
    /// Deletes `key`. Removing an absent key succeeds.
    pub async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        ensure_active(cancel)?;
        self.store
            .delete_item(
                &self.options.cache_table_name,
                &self.options.partition_key_attribute_name,
                key,
            )
            .await?;
        debug!(key, "cache remove");
        Ok(())
    }

    // == Fetch And Maybe Refresh ==
    /// Shared read path of `get` and `refresh`.
    ///
    /// Returns the live entry (if any) and what was done about its window.
    /// A lost refresh race never changes the entry returned.
    async fn fetch_and_maybe_refresh(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<CacheEntry>, RefreshOutcome)> {
        ensure_active(cancel)?;
        let now = self.clock.now();

        let item = self
            .store
            .get_item(
                &self.options.cache_table_name,
                &self.options.partition_key_attribute_name,
                key,
            )
            .await?;
        let Some(item) = item else {
            debug!(key, "cache miss");
            return Ok((None, RefreshOutcome::SkippedNotNeeded));
        };

        let mut entry = CacheEntry::from_item(&item, &self.options.partition_key_attribute_name)?;
        let expired = entry.is_expired(now);

        let refreshed_at = compute_refreshed_expiry(&entry, now);
        let outcome = if refreshed_at == entry.expires_at {
            RefreshOutcome::SkippedNotNeeded
        } else {
            ensure_active(cancel)?;
            let observed = entry.row_version;
            let updated = CacheEntry {
                expires_at: refreshed_at,
                row_version: self.next_version(Some(observed)),
                ..entry.clone()
            };
            match self.persist(&updated, Some(observed)).await {
                Ok(()) => {
                    entry = updated;
                    RefreshOutcome::Updated
                }
                Err(CacheError::WriteConflict { .. }) => {
                    debug!(key, observed, "sliding refresh lost to a concurrent writer");
                    RefreshOutcome::LostRace
                }
                Err(err) => return Err(err),
            }
        };

        if expired {
            debug!(key, expires_at = %entry.expires_at, "cache entry expired");
            return Ok((None, outcome));
        }

        debug!(key, outcome = ?outcome, expires_at = %entry.expires_at, "cache hit");
        Ok((Some(entry), outcome))
    }

    // == Persist ==
    /// Conditional write shared by `set` and the refresh step.
    ///
    /// The put succeeds if the row is absent or still carries `observed`.
    async fn persist(&self, entry: &CacheEntry, observed: Option<i64>) -> Result<()> {
        let condition = match (self.options.row_versioning, observed) {
            (RowVersioning::Fixed, _) => PutCondition::NotExistsOrEquals {
                attribute: ROW_VERSION_ATTRIBUTE.to_string(),
                expected: 0,
            },
            (RowVersioning::Incrementing, Some(expected)) => PutCondition::NotExistsOrEquals {
                attribute: ROW_VERSION_ATTRIBUTE.to_string(),
                expected,
            },
            (RowVersioning::Incrementing, None) => PutCondition::NotExists,
        };

        let item = entry.to_item(&self.options.partition_key_attribute_name);
        match self
            .store
            .put_item(
                &self.options.cache_table_name,
                &self.options.partition_key_attribute_name,
                item,
                condition,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::ConditionalCheckFailed) => Err(CacheError::WriteConflict {
                key: entry.key.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Reads only the current lock token for `key`, `None` if absent.
    async fn read_row_version(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<i64>> {
        ensure_active(cancel)?;
        let item = self
            .store
            .get_item(
                &self.options.cache_table_name,
                &self.options.partition_key_attribute_name,
                key,
            )
            .await?;
        Ok(item.as_ref().map(decode_row_version).transpose()?)
    }

    fn next_version(&self, observed: Option<i64>) -> i64 {
        match (self.options.row_versioning, observed) {
            (RowVersioning::Fixed, _) | (RowVersioning::Incrementing, None) => 0,
            (RowVersioning::Incrementing, Some(version)) => version.wrapping_add(1),
        }
    }
}

impl std::fmt::Debug for DistributedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedCache")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(CacheError::Cancelled)
    } else {
        Ok(())
    }
}
