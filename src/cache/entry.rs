//! Cache Entry Module
//!
//! Defines the persisted cache entry and its mapping to and from the
//! store's native item representation.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use thiserror::Error;

use crate::store::{AttributeValue, Item};

// == Attribute Names ==
/// Binary payload attribute
pub const CONTENT_ATTRIBUTE: &str = "content";
/// Absolute expiry attribute (RFC 3339, UTC)
pub const EXPIRES_AT_ATTRIBUTE: &str = "expiresAtUtc";
/// Sliding window attribute (milliseconds, or NULL)
pub const SLIDING_EXPIRATION_ATTRIBUTE: &str = "slidingExpiration";
/// Optimistic-lock token attribute
pub const ROW_VERSION_ATTRIBUTE: &str = "rowVersion";
/// Optional ceiling for sliding refreshes (RFC 3339, UTC)
pub const ABSOLUTE_CEILING_ATTRIBUTE: &str = "absoluteExpiresAtUtc";

/// Attribute names owned by the entry encoding. The partition key
/// attribute must not collide with any of them.
pub const RESERVED_ATTRIBUTES: [&str; 5] = [
    CONTENT_ATTRIBUTE,
    EXPIRES_AT_ATTRIBUTE,
    SLIDING_EXPIRATION_ATTRIBUTE,
    ROW_VERSION_ATTRIBUTE,
    ABSOLUTE_CEILING_ATTRIBUTE,
];

// == Decode Error ==
/// A stored item that does not describe a valid cache entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Stored item is missing attribute '{0}'")]
    MissingAttribute(String),

    #[error("Attribute '{attribute}' has type {found}, expected {expected}")]
    WrongType {
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Attribute '{attribute}' is malformed: {reason}")]
    InvalidValue { attribute: String, reason: String },
}

// == Cache Entry ==
/// A cached value with its expiration metadata and lock version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Cache key, also the store's partition key
    pub key: String,
    /// Opaque payload
    pub content: Vec<u8>,
    /// Instant after which the entry is logically gone
    pub expires_at: DateTime<Utc>,
    /// Renewal window applied on each successful read
    pub sliding_expiration: Option<Duration>,
    /// Upper bound for sliding renewals, when enforced
    pub absolute_ceiling: Option<DateTime<Utc>>,
    /// Optimistic-lock token as last read from (or written to) the store
    pub row_version: i64,
}

impl CacheEntry {
    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches `expires_at`, so a zero-length
    /// lifetime is expired immediately.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    // == Encode ==
    /// Encodes the entry as a store item, keyed under `key_attribute`.
    pub fn to_item(&self, key_attribute: &str) -> Item {
        let mut item = Item::with_capacity(6);
        item.insert(key_attribute.to_string(), AttributeValue::S(self.key.clone()));
        item.insert(
            CONTENT_ATTRIBUTE.to_string(),
            AttributeValue::B(self.content.clone()),
        );
        item.insert(
            EXPIRES_AT_ATTRIBUTE.to_string(),
            AttributeValue::S(encode_timestamp(self.expires_at)),
        );
        item.insert(
            SLIDING_EXPIRATION_ATTRIBUTE.to_string(),
            match self.sliding_expiration {
                Some(window) => AttributeValue::N(window.num_milliseconds().to_string()),
                None => AttributeValue::Null,
            },
        );
        item.insert(
            ROW_VERSION_ATTRIBUTE.to_string(),
            AttributeValue::N(self.row_version.to_string()),
        );
        if let Some(ceiling) = self.absolute_ceiling {
            item.insert(
                ABSOLUTE_CEILING_ATTRIBUTE.to_string(),
                AttributeValue::S(encode_timestamp(ceiling)),
            );
        }
        item
    }

    // == Decode ==
    /// Decodes a store item read back under `key_attribute`.
    ///
    /// Every attribute written by [`CacheEntry::to_item`] is required,
    /// except the optional absolute ceiling.
    pub fn from_item(item: &Item, key_attribute: &str) -> Result<Self, DecodeError> {
        let key = expect_string(item, key_attribute)?.to_string();

        let content = match required(item, CONTENT_ATTRIBUTE)? {
            AttributeValue::B(bytes) => bytes.clone(),
            other => return Err(wrong_type(CONTENT_ATTRIBUTE, "B", other)),
        };

        let expires_at = decode_timestamp(
            EXPIRES_AT_ATTRIBUTE,
            expect_string(item, EXPIRES_AT_ATTRIBUTE)?,
        )?;

        let sliding_expiration = match required(item, SLIDING_EXPIRATION_ATTRIBUTE)? {
            AttributeValue::Null => None,
            AttributeValue::N(n) => {
                let millis = parse_number(SLIDING_EXPIRATION_ATTRIBUTE, n)?;
                Some(Duration::try_milliseconds(millis).ok_or_else(|| {
                    DecodeError::InvalidValue {
                        attribute: SLIDING_EXPIRATION_ATTRIBUTE.to_string(),
                        reason: format!("{} ms is out of range", millis),
                    }
                })?)
            }
            other => return Err(wrong_type(SLIDING_EXPIRATION_ATTRIBUTE, "N", other)),
        };

        let absolute_ceiling = match item.get(ABSOLUTE_CEILING_ATTRIBUTE) {
            None | Some(AttributeValue::Null) => None,
            Some(AttributeValue::S(s)) => Some(decode_timestamp(ABSOLUTE_CEILING_ATTRIBUTE, s)?),
            Some(other) => return Err(wrong_type(ABSOLUTE_CEILING_ATTRIBUTE, "S", other)),
        };

        Ok(Self {
            key,
            content,
            expires_at,
            sliding_expiration,
            absolute_ceiling,
            row_version: decode_row_version(item)?,
        })
    }
}

// == Row Version ==
/// Reads only the lock token from a stored item.
pub fn decode_row_version(item: &Item) -> Result<i64, DecodeError> {
    match required(item, ROW_VERSION_ATTRIBUTE)? {
        AttributeValue::N(n) => parse_number(ROW_VERSION_ATTRIBUTE, n),
        other => Err(wrong_type(ROW_VERSION_ATTRIBUTE, "N", other)),
    }
}

// == Timestamp Range ==
/// Latest instant the RFC 3339 timestamp attributes can hold
/// (9999-12-31T23:59:59.999999999Z). Later instants do not decode.
pub fn latest_storable_instant() -> DateTime<Utc> {
    DateTime::from_timestamp(253_402_300_799, 999_999_999).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Helpers ==
fn encode_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(attribute: &str, raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DecodeError::InvalidValue {
            attribute: attribute.to_string(),
            reason: e.to_string(),
        })
}

fn parse_number(attribute: &str, raw: &str) -> Result<i64, DecodeError> {
    raw.parse().map_err(|_| DecodeError::InvalidValue {
        attribute: attribute.to_string(),
        reason: format!("'{}' is not an integer", raw),
    })
}

fn required<'a>(item: &'a Item, attribute: &str) -> Result<&'a AttributeValue, DecodeError> {
    item.get(attribute)
        .ok_or_else(|| DecodeError::MissingAttribute(attribute.to_string()))
}

fn expect_string<'a>(item: &'a Item, attribute: &str) -> Result<&'a str, DecodeError> {
    match required(item, attribute)? {
        AttributeValue::S(s) => Ok(s),
        other => Err(wrong_type(attribute, "S", other)),
    }
}

fn wrong_type(attribute: &str, expected: &'static str, found: &AttributeValue) -> DecodeError {
    DecodeError::WrongType {
        attribute: attribute.to_string(),
        expected,
        found: found.type_name(),
    }
}
