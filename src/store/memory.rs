//! In-Memory Store
//!
//! A process-local [`KeyValueStore`] whose conditional puts are evaluated
//! and applied under a single write lock, so compare-and-set is atomic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::{AttributeValue, Item, KeyValueStore, PutCondition, StoreError};

type Table = HashMap<String, Item>;

// == In-Memory Store ==
/// Thread-safe in-memory tables, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl InMemoryStore {
    /// Creates a store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one empty table.
    pub fn with_table(name: impl Into<String>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(name.into(), Table::new());
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Number of rows in `table`, or `None` if the table does not exist.
    pub async fn len(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(HashMap::len)
    }
}

fn partition_key<'a>(item: &'a Item, key_attribute: &str) -> Result<&'a str, StoreError> {
    match item.get(key_attribute) {
        Some(AttributeValue::S(key)) => Ok(key),
        _ => Err(StoreError::Validation(format!(
            "item is missing string partition key '{}'",
            key_attribute
        ))),
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_item(
        &self,
        table: &str,
        _key_attribute: &str,
        key: &str,
    ) -> Result<Option<Item>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(rows.get(key).cloned())
    }

    async fn put_item(
        &self,
        table: &str,
        key_attribute: &str,
        item: Item,
        condition: PutCondition,
    ) -> Result<(), StoreError> {
        let key = partition_key(&item, key_attribute)?.to_string();

        // Evaluate and write under one lock acquisition
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        if !condition.is_satisfied_by(rows.get(&key)) {
            trace!(table, key = %key, %condition, "conditional put rejected");
            return Err(StoreError::ConditionalCheckFailed);
        }

        rows.insert(key, item);
        Ok(())
    }

    async fn delete_item(
        &self,
        table: &str,
        _key_attribute: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        rows.remove(key);
        Ok(())
    }
}
