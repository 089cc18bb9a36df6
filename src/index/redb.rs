//! Durable index store on redb.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::info;

use super::{IndexError, IndexStore};

const INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("madrone-index");

/// Persistent [`IndexStore`] backed by an embedded redb database.
///
/// Each mutation runs in its own write transaction; the commit is the
/// durability point, so a row that `put` reported written survives a
/// process crash.
pub struct RedbIndexStore {
    db: Arc<Database>,
}

impl RedbIndexStore {
    /// Open or create the index database at `path`.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(|e| IndexError::Backend {
            message: format!("failed to open index at {}: {}", path.display(), e),
        })?;

        // Ensure the table exists so read transactions never race creation.
        let txn = db.begin_write().map_err(backend)?;
        txn.open_table(INDEX_TABLE).map_err(backend)?;
        txn.commit().map_err(backend)?;

        info!(path = %path.display(), "index store opened");
        Ok(Self { db: Arc::new(db) })
    }
}

fn backend<E: std::fmt::Display>(e: E) -> IndexError {
    IndexError::Backend {
        message: e.to_string(),
    }
}

#[async_trait]
impl IndexStore for RedbIndexStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), IndexError> {
        let txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = txn.open_table(INDEX_TABLE).map_err(backend)?;
            table.insert(key, value).map_err(backend)?;
        }
        txn.commit().map_err(backend)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, IndexError> {
        let txn = self.db.begin_read().map_err(backend)?;
        let table = txn.open_table(INDEX_TABLE).map_err(backend)?;
        Ok(table
            .get(key)
            .map_err(backend)?
            .map(|guard| guard.value().to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), IndexError> {
        let txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = txn.open_table(INDEX_TABLE).map_err(backend)?;
            table.remove(key).map_err(backend)?;
        }
        txn.commit().map_err(backend)
    }

    async fn has(&self, key: &str) -> Result<bool, IndexError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, IndexError> {
        let txn = self.db.begin_read().map_err(backend)?;
        let table = txn.open_table(INDEX_TABLE).map_err(backend)?;

        let mut rows = Vec::new();
        for item in table.range(prefix..).map_err(backend)? {
            let (key, value) = item.map_err(backend)?;
            if !key.value().starts_with(prefix) {
                break;
            }
            rows.push((key.value().to_string(), value.value().to_string()));
        }
        Ok(rows)
    }
}
