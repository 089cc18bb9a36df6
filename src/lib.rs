//! madrone library entry point.
//!
//! madrone is an S3-compatible object-storage gateway that keeps bucket and
//! object metadata as immutable, content-addressed records in a remote DAG
//! store. A small local index (the ledger) maps S3 names to the CIDs of the
//! current record versions; every mutation writes new blocks and atomically
//! repoints the index, so old versions stay readable and nothing is ever
//! rewritten in place.

#![warn(missing_docs)]

/// Content identifiers for DAG blocks.
pub mod cid;
/// Gateway configuration loaded from the environment.
pub mod config;
/// DAG client adapter: block round-trips against the remote node API.
pub mod dag;
/// Local index store: the authoritative name-to-CID pointer table.
pub mod index;
/// The ledger engine: buckets, objects, multipart uploads, locking.
pub mod ledger;
/// S3 frontend adapter built on s3s.
pub mod s3;
/// DAG-syncer adapter consumed by the replication layer.
pub mod sync;

pub use cid::Cid;
pub use dag::{BlockStore, DagClient, DagError, MemoryBlockStore, RemoteBlockStore};
pub use index::{IndexStore, MemoryIndexStore, RedbIndexStore};
pub use ledger::{LedgerEngine, LedgerError};
pub use s3::MadroneS3Service;
