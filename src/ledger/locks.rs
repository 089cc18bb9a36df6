//! Per-bucket lock table.
//!
//! Named reader/writer locks keyed by bucket name. Locks are created on
//! first use and never destroyed while held; the map itself is protected
//! by a coarse mutex that is only held long enough to clone the entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Table of named per-bucket RwLocks.
#[derive(Default)]
pub struct BucketLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl BucketLocks {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Acquire the read lock for a bucket.
    pub async fn read(&self, name: &str) -> OwnedRwLockReadGuard<()> {
        self.entry(name).read_owned().await
    }

    /// Acquire the write lock for a bucket.
    pub async fn write(&self, name: &str) -> OwnedRwLockWriteGuard<()> {
        self.entry(name).write_owned().await
    }
}

/// Guards held by a cross-bucket copy.
///
/// Acquisition follows the ordering rule: when source and destination
/// differ, locks are taken in ascending lexicographic order of bucket
/// name regardless of role, which makes opposing concurrent copies
/// deadlock-free. Equal names take only the destination write lock.
pub enum CopyLocks {
    /// Source and destination are the same bucket.
    Same(OwnedRwLockWriteGuard<()>),
    /// Distinct buckets: read guard on the source, write guard on the
    /// destination.
    Distinct {
        /// Source bucket read guard.
        _source: OwnedRwLockReadGuard<()>,
        /// Destination bucket write guard.
        _destination: OwnedRwLockWriteGuard<()>,
    },
}

impl BucketLocks {
    /// Lock a source/destination bucket pair for a copy.
    pub async fn lock_copy_pair(&self, source: &str, destination: &str) -> CopyLocks {
        if source == destination {
            return CopyLocks::Same(self.write(destination).await);
        }
        if source < destination {
            let src = self.read(source).await;
            let dst = self.write(destination).await;
            CopyLocks::Distinct {
                _source: src,
                _destination: dst,
            }
        } else {
            let dst = self.write(destination).await;
            let src = self.read(source).await;
            CopyLocks::Distinct {
                _source: src,
                _destination: dst,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_resolves_to_one_lock() {
        let locks = BucketLocks::new();
        let a = locks.entry("bucket");
        let b = locks.entry("bucket");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn writers_exclude_each_other() {
        let locks = Arc::new(BucketLocks::new());
        let guard = locks.write("b").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.write("b").await;
            })
        };

        // The second writer must not acquire while the first guard lives.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn opposing_copy_pairs_do_not_deadlock() {
        let locks = Arc::new(BucketLocks::new());

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let forward = locks.clone();
            tasks.push(tokio::spawn(async move {
                let _guards = forward.lock_copy_pair("a", "b").await;
            }));
            let reverse = locks.clone();
            tasks.push(tokio::spawn(async move {
                let _guards = reverse.lock_copy_pair("b", "a").await;
            }));
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            for task in tasks {
                task.await.unwrap();
            }
        })
        .await
        .expect("copy pairs deadlocked");
    }
}
