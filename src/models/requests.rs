//! Request DTOs for the cache gateway API
//!
//! Defines the query parameters accepted alongside raw request bodies.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::cache::{EntryOptions, MAX_KEY_LENGTH};

/// Query parameters for the SET operation (PUT /cache/:key)
///
/// The request body carries the raw bytes to cache.
///
/// # Fields
/// - `absolute_expiration`: RFC 3339 instant at which the entry expires
/// - `expires_in_secs`: lifetime in seconds measured from the write
/// - `sliding_secs`: sliding window in seconds (uses default if not specified)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetParams {
    #[serde(default)]
    pub absolute_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_in_secs: Option<i64>,
    #[serde(default)]
    pub sliding_secs: Option<i64>,
}

impl SetParams {
    /// Converts the parameters into cache entry options.
    ///
    /// Returns an error message if a duration is out of range.
    pub fn to_entry_options(&self) -> Result<EntryOptions, String> {
        Ok(EntryOptions {
            absolute_expiration: self.absolute_expiration,
            absolute_expiration_relative_to_now: self
                .expires_in_secs
                .map(|secs| seconds("expires_in_secs", secs))
                .transpose()?,
            sliding_expiration: self
                .sliding_secs
                .map(|secs| seconds("sliding_secs", secs))
                .transpose()?,
        })
    }
}

fn seconds(name: &str, secs: i64) -> Result<Duration, String> {
    Duration::try_seconds(secs).ok_or_else(|| format!("{} is out of range", name))
}

/// Validates a cache key taken from the request path
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_params_deserialize_empty() {
        let params: SetParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.to_entry_options().unwrap(), EntryOptions::new());
    }

    #[test]
    fn test_set_params_with_expirations() {
        let json = r#"{
            "absolute_expiration": "2030-01-01T00:00:00Z",
            "expires_in_secs": 60,
            "sliding_secs": 30
        }"#;
        let params: SetParams = serde_json::from_str(json).unwrap();
        let options = params.to_entry_options().unwrap();

        assert_eq!(
            options.absolute_expiration.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
        assert_eq!(
            options.absolute_expiration_relative_to_now,
            Some(Duration::seconds(60))
        );
        assert_eq!(options.sliding_expiration, Some(Duration::seconds(30)));
    }

    #[test]
    fn test_set_params_out_of_range() {
        let params = SetParams {
            sliding_secs: Some(i64::MAX),
            ..SetParams::default()
        };
        assert!(params.to_entry_options().is_err());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH)).is_none());
        assert!(validate_key("user:42").is_none());
    }
}
