//! Expiration Policy
//!
//! Pure computation of an entry's expiry at write time and of its extension
//! on a sliding refresh. Nothing here reads the clock; callers pass `now`.

use chrono::{DateTime, Duration, Utc};

use crate::cache::{latest_storable_instant, CacheEntry};
use crate::error::{CacheError, Result};

// == Entry Options ==
/// Caller-supplied expiration settings for a `set`.
///
/// When several are given, an absolute timestamp wins over a relative one,
/// and either wins over the sliding window for the initial expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// Fixed instant at which the entry expires
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Lifetime measured from the moment of the write
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Renewal window; falls back to the configured default when absent
    pub sliding_expiration: Option<Duration>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    pub fn with_expiration_relative_to_now(mut self, lifetime: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(lifetime);
        self
    }

    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }
}

// == Initial Expiry ==
/// Expiration metadata for a freshly written entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialExpiry {
    /// Instant the new entry expires
    pub expires_at: DateTime<Utc>,
    /// Window stored on the entry, always populated
    pub sliding_expiration: Duration,
    /// The absolute instant the caller asked for, if any
    pub absolute: Option<DateTime<Utc>>,
}

/// Computes the expiry of a new entry written at `now`.
///
/// # Errors
/// [`CacheError::InvalidExpiration`] when:
/// - the absolute expiration is strictly before `now`
/// - the relative lifetime is not positive
/// - the sliding window is negative or not a whole number of milliseconds
/// - the expiry falls after [`latest_storable_instant`]
pub fn compute_initial_expiry(
    options: &EntryOptions,
    default_sliding: Duration,
    now: DateTime<Utc>,
) -> Result<InitialExpiry> {
    let sliding = options.sliding_expiration.unwrap_or(default_sliding);
    if sliding < Duration::zero() {
        return Err(CacheError::InvalidExpiration(format!(
            "sliding expiration must not be negative, got {}",
            sliding
        )));
    }
    if sliding.subsec_nanos() % 1_000_000 != 0 {
        return Err(CacheError::InvalidExpiration(format!(
            "sliding expiration must be whole milliseconds, got {}",
            sliding
        )));
    }

    let absolute = match (
        options.absolute_expiration,
        options.absolute_expiration_relative_to_now,
    ) {
        (Some(at), _) => {
            if at < now {
                return Err(CacheError::InvalidExpiration(format!(
                    "absolute expiration {} is in the past",
                    at.to_rfc3339()
                )));
            }
            Some(at)
        }
        (None, Some(lifetime)) => {
            if lifetime <= Duration::zero() {
                return Err(CacheError::InvalidExpiration(format!(
                    "relative expiration must be positive, got {}",
                    lifetime
                )));
            }
            Some(offset(now, lifetime)?)
        }
        (None, None) => None,
    };

    let expires_at = match absolute {
        Some(at) => at,
        None => offset(now, sliding)?,
    };
    // Also bounds the ceiling, which is the absolute expiration when present
    let latest = latest_storable_instant();
    if expires_at > latest {
        return Err(CacheError::InvalidExpiration(format!(
            "expiration {} is later than {}",
            expires_at.to_rfc3339(),
            latest.to_rfc3339()
        )));
    }

    Ok(InitialExpiry {
        expires_at,
        sliding_expiration: sliding,
        absolute,
    })
}

/// Computes the expiry an entry should carry after being read at `now`.
///
/// Returns `entry.expires_at` unchanged when the entry has no sliding
/// window (or a zero one) or is already expired. Otherwise the expiry moves
/// to `now + window`, capped at the entry's absolute ceiling if it has one
/// and never past [`latest_storable_instant`].
pub fn compute_refreshed_expiry(entry: &CacheEntry, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(window) = entry.sliding_expiration else {
        return entry.expires_at;
    };
    if window <= Duration::zero() || entry.is_expired(now) {
        return entry.expires_at;
    }

    let latest = latest_storable_instant();
    let extended = now
        .checked_add_signed(window)
        .map_or(latest, |at| at.min(latest));
    match entry.absolute_ceiling {
        Some(ceiling) => extended.min(ceiling),
        None => extended,
    }
}

fn offset(now: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(by).ok_or_else(|| {
        CacheError::InvalidExpiration(format!("expiration {} from now is out of range", by))
    })
}
