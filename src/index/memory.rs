//! In-memory index store for tests.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{IndexError, IndexStore};

/// Non-persistent [`IndexStore`] on a sorted map.
///
/// Mirrors the durable store's semantics (atomic rows, lexicographic
/// scans) without touching disk.
#[derive(Default)]
pub struct MemoryIndexStore {
    rows: RwLock<BTreeMap<String, String>>,
}

impl MemoryIndexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), IndexError> {
        self.rows
            .write()
            .expect("index map poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, IndexError> {
        Ok(self
            .rows
            .read()
            .expect("index map poisoned")
            .get(key)
            .cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.rows.write().expect("index map poisoned").remove(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, IndexError> {
        Ok(self
            .rows
            .read()
            .expect("index map poisoned")
            .contains_key(key))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, IndexError> {
        let rows = self.rows.read().expect("index map poisoned");
        Ok(rows
            .range::<String, _>((Bound::Included(prefix.to_string()), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryIndexStore::new();
        store.put("buckets/a", "cid-a").await.unwrap();
        assert_eq!(store.get("buckets/a").await.unwrap().as_deref(), Some("cid-a"));
        assert!(store.has("buckets/a").await.unwrap());

        store.delete("buckets/a").await.unwrap();
        assert_eq!(store.get("buckets/a").await.unwrap(), None);
        assert!(!store.has("buckets/a").await.unwrap());
    }

    #[tokio::test]
    async fn scan_is_ordered_and_prefix_bound() {
        let store = MemoryIndexStore::new();
        store.put("buckets/c", "3").await.unwrap();
        store.put("buckets/a", "1").await.unwrap();
        store.put("buckets/b", "2").await.unwrap();
        store.put("ledger-state", "x").await.unwrap();

        let rows = store.scan_prefix("buckets/").await.unwrap();
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["buckets/a", "buckets/b", "buckets/c"]);
    }
}
