//! Store Module
//!
//! The key-value store the cache is layered over. The store offers
//! single-item get/put/delete against a table keyed by one partition key,
//! plus conditional puts. It knows nothing about expiration.

mod memory;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryStore;

// == Attribute Value ==
/// A single attribute in a stored item, using the store's native types.
///
/// Numbers travel as decimal strings, as they do on the store's wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// UTF-8 string
    S(String),
    /// Decimal number
    N(String),
    /// Raw bytes
    B(Vec<u8>),
    /// Explicit null
    Null,
}

impl AttributeValue {
    /// Short type tag used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Null => "NULL",
        }
    }
}

/// A stored item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

// == Put Condition ==
/// Server-side predicate a put must satisfy to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutCondition {
    /// Apply the put only if no row exists for the partition key.
    NotExists,
    /// Apply the put if no row exists, or if the row's numeric
    /// `attribute` currently equals `expected`.
    NotExistsOrEquals { attribute: String, expected: i64 },
}

impl PutCondition {
    /// Evaluates the condition against the row currently stored, if any.
    pub fn is_satisfied_by(&self, current: Option<&Item>) -> bool {
        let Some(current) = current else {
            return true;
        };
        match self {
            PutCondition::NotExists => false,
            PutCondition::NotExistsOrEquals { attribute, expected } => {
                match current.get(attribute) {
                    Some(AttributeValue::N(n)) => n.parse::<i64>().ok() == Some(*expected),
                    _ => false,
                }
            }
        }
    }
}

impl fmt::Display for PutCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutCondition::NotExists => write!(f, "attribute_not_exists(#pk)"),
            PutCondition::NotExistsOrEquals { attribute, expected } => {
                write!(f, "attribute_not_exists(#pk) OR {} = {}", attribute, expected)
            }
        }
    }
}

// == Store Error ==
/// Failures reported by a store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The put's condition did not hold at commit time
    #[error("Conditional check failed")]
    ConditionalCheckFailed,

    /// The table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The request was malformed
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Transport or service failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// == Key-Value Store Trait ==
/// Primitive operations the cache needs from its backing store.
///
/// Implementations own their transport, including any retry policy.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the item whose `key_attribute` equals `key`.
    async fn get_item(
        &self,
        table: &str,
        key_attribute: &str,
        key: &str,
    ) -> Result<Option<Item>, StoreError>;

    /// Writes `item`, replacing any existing row, if `condition` holds.
    ///
    /// Returns [`StoreError::ConditionalCheckFailed`] when it does not.
    async fn put_item(
        &self,
        table: &str,
        key_attribute: &str,
        item: Item,
        condition: PutCondition,
    ) -> Result<(), StoreError>;

    /// Deletes the row for `key`. Deleting an absent row succeeds.
    async fn delete_item(&self, table: &str, key_attribute: &str, key: &str)
        -> Result<(), StoreError>;
}
