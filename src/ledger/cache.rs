//! In-memory bucket record cache.
//!
//! Maps bucket names to their loaded records. All access happens while the
//! caller holds the bucket's lock from the lock table, so the cache itself
//! only needs a short-lived mutex around the map. Entries are installed
//! write-through: a record is only cached after its CID has been committed
//! to the index, which keeps a clean cache entry equal to the record the
//! index points at.

use std::collections::HashMap;
use std::sync::Mutex;

use super::records::Bucket;

/// Cache of loaded bucket records.
#[derive(Default)]
pub struct BucketCache {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl BucketCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the cached record for a bucket, if present.
    pub fn get(&self, name: &str) -> Option<Bucket> {
        self.buckets
            .lock()
            .expect("bucket cache poisoned")
            .get(name)
            .cloned()
    }

    /// Install or replace the cached record for a bucket.
    pub fn insert(&self, name: &str, record: Bucket) {
        self.buckets
            .lock()
            .expect("bucket cache poisoned")
            .insert(name.to_string(), record);
    }

    /// Drop the cached record for a bucket.
    pub fn evict(&self, name: &str) {
        self.buckets
            .lock()
            .expect("bucket cache poisoned")
            .remove(name);
    }
}
