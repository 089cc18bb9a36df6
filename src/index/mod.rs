//! Local index store.
//!
//! The index is the gateway's authoritative pointer table: one row per
//! bucket under `buckets/<name>` holding the CID of the bucket's current
//! record, plus the `ledger-state` row for the multipart registry. Writing
//! a row is the linearization point of every mutation, so `put` must be
//! atomic and durable.

mod memory;
mod redb;

pub use memory::MemoryIndexStore;
pub use redb::RedbIndexStore;

use async_trait::async_trait;
use snafu::Snafu;

/// Key prefix for bucket pointer rows.
pub const BUCKET_KEY_PREFIX: &str = "buckets/";

/// Key of the ledger-state pointer row.
pub const LEDGER_STATE_KEY: &str = "ledger-state";

/// Errors from index store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IndexError {
    /// The backing store failed.
    #[snafu(display("index store failure: {message}"))]
    Backend {
        /// Backend error detail.
        message: String,
    },
}

/// Embedded key-value store holding the gateway's name-to-CID pointers.
///
/// `put` must be atomic and survive a process crash once it returns.
/// `scan_prefix` returns rows in lexicographic key order.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Atomically set a key.
    async fn put(&self, key: &str, value: &str) -> Result<(), IndexError>;

    /// Read a key, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, IndexError>;

    /// Atomically remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), IndexError>;

    /// Check whether a key exists.
    async fn has(&self, key: &str) -> Result<bool, IndexError>;

    /// All rows whose key starts with `prefix`, in lexicographic key order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, IndexError>;
}

/// Build the index key of a bucket's pointer row.
pub fn bucket_key(name: &str) -> String {
    format!("{}{}", BUCKET_KEY_PREFIX, name)
}
