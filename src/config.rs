//! Configuration Module
//!
//! Cache options consumed by the engine, and the gateway configuration
//! loaded from environment variables.

use std::env;
use std::str::FromStr;

use chrono::Duration;

use crate::cache::RESERVED_ATTRIBUTES;
use crate::error::{CacheError, Result};

// == Row Versioning ==
/// How the optimistic-lock token evolves across writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowVersioning {
    /// Each write stores the observed version plus one and is conditioned
    /// on the observed version. `set` reads the current version first.
    #[default]
    Incrementing,
    /// Every write stores version 0 and is conditioned on "absent or 0".
    /// Only distinguishes "row exists" from "row absent".
    Fixed,
}

impl FromStr for RowVersioning {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incrementing" => Ok(RowVersioning::Incrementing),
            "fixed" => Ok(RowVersioning::Fixed),
            other => Err(format!("unknown row versioning mode '{}'", other)),
        }
    }
}

// == Cache Options ==
/// Options consumed by [`crate::DistributedCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Table cache entries are written to
    pub cache_table_name: String,
    /// Name of the partition key attribute
    pub partition_key_attribute_name: String,
    /// Sliding window used when a `set` supplies no expiration
    pub default_sliding_expiration: Duration,
    pub row_versioning: RowVersioning,
    /// Cap sliding refreshes at the absolute expiration given to `set`
    pub enforce_absolute_ceiling: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_table_name: "distributed-cache".to_string(),
            partition_key_attribute_name: "pk".to_string(),
            default_sliding_expiration: Duration::minutes(15),
            row_versioning: RowVersioning::default(),
            enforce_absolute_ceiling: false,
        }
    }
}

impl CacheOptions {
    /// Checks the options, collecting every failure.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] listing each problem found.
    pub fn validate(&self) -> Result<()> {
        let mut failures = Vec::new();

        if self.cache_table_name.trim().is_empty() {
            failures.push("Cache table name must be set".to_string());
        }

        let pk = self.partition_key_attribute_name.trim();
        if pk.is_empty() {
            failures.push("Partition key attribute name must be set".to_string());
        } else if RESERVED_ATTRIBUTES.contains(&pk) {
            failures.push(format!(
                "Partition key attribute name '{}' collides with an entry attribute",
                pk
            ));
        }

        if self.default_sliding_expiration <= Duration::zero() {
            failures.push("Default sliding expiration must be positive".to_string());
        } else if self.default_sliding_expiration.subsec_nanos() % 1_000_000 != 0 {
            failures.push("Default sliding expiration must be whole milliseconds".to_string());
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CacheError::InvalidConfig(failures))
        }
    }
}

// == Gateway Config ==
/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Options handed to the cache engine
    pub cache: CacheOptions,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TABLE_NAME` - Table name (default: distributed-cache)
    /// - `PARTITION_KEY_ATTRIBUTE_NAME` - Partition key attribute (default: pk)
    /// - `DEFAULT_SLIDING_EXPIRATION` - Default sliding window in seconds (default: 900)
    /// - `ROW_VERSIONING` - `incrementing` or `fixed` (default: incrementing)
    /// - `ENFORCE_ABSOLUTE_CEILING` - `true` or `false` (default: false)
    pub fn from_env() -> Self {
        let defaults = CacheOptions::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(3000),
            cache: CacheOptions {
                cache_table_name: env::var("CACHE_TABLE_NAME")
                    .unwrap_or(defaults.cache_table_name),
                partition_key_attribute_name: env::var("PARTITION_KEY_ATTRIBUTE_NAME")
                    .unwrap_or(defaults.partition_key_attribute_name),
                default_sliding_expiration: parse_var::<i64>("DEFAULT_SLIDING_EXPIRATION")
                    .and_then(Duration::try_seconds)
                    .unwrap_or(defaults.default_sliding_expiration),
                row_versioning: parse_var("ROW_VERSIONING").unwrap_or(defaults.row_versioning),
                enforce_absolute_ceiling: parse_var("ENFORCE_ABSOLUTE_CEILING")
                    .unwrap_or(defaults.enforce_absolute_ceiling),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache: CacheOptions::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
