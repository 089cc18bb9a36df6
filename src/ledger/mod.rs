//! The ledger: the gateway's authoritative namespace and multipart
//! registry.
//!
//! # Architecture
//!
//! The engine keeps no object data of its own. Every bucket, object and
//! ledger-state record is an immutable block in the DAG store; the local
//! index holds one pointer per bucket (`buckets/<name>` → record CID) plus
//! the `ledger-state` pointer. Mutations write new blocks and atomically
//! repoint the index while holding the bucket's write lock, which gives
//! strict read-after-write ordering per bucket.
//!
//! # Locking discipline
//!
//! Internal functions never claim or release locks; public operations
//! acquire them at entry and hold them across every remote round-trip so
//! the index update happens under the lock. Cross-bucket copies acquire
//! locks in ascending lexicographic bucket-name order.

mod cache;
mod engine;
mod error;
mod locks;
/// Serialized record schemas.
pub mod records;

pub use engine::{BucketInfo, LedgerEngine, PutObjectOptions};
pub use error::{LedgerError, LedgerResult};
pub use locks::{BucketLocks, CopyLocks};
