//! DAG client adapter.
//!
//! Provides the [`BlockStore`] trait over the remote node's raw-block API
//! and [`DagClient`], which layers CID verification and record
//! serialization on top of any block store.

mod client;
mod memory;
mod remote;

pub use client::DagClient;
pub use memory::MemoryBlockStore;
pub use remote::{NodeRequest, NodeResponse, RemoteBlockStore, DAG_ALPN};

use async_trait::async_trait;
use bytes::Bytes;
use snafu::Snafu;

use crate::cid::Cid;

/// Errors from DAG store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DagError {
    /// The node does not have the requested block.
    #[snafu(display("block not found: {cid}"))]
    NotFound {
        /// CID of the missing block.
        cid: Cid,
    },

    /// Transport failure talking to the node API.
    #[snafu(display("DAG node unavailable: {message}"))]
    Unavailable {
        /// Underlying transport error.
        message: String,
    },

    /// A fetched block hashed to something other than the requested CID.
    #[snafu(display("CID mismatch: requested {requested}, block hashed to {actual}"))]
    CidMismatch {
        /// CID the caller asked for.
        requested: Cid,
        /// CID the returned bytes actually hash to.
        actual: Cid,
    },

    /// A block's bytes could not be decoded as the expected record.
    #[snafu(display("corrupt record at {cid}: {message}"))]
    Corrupt {
        /// CID of the undecodable block.
        cid: Cid,
        /// Decode failure detail.
        message: String,
    },

    /// The operation's deadline fired before the node answered.
    #[snafu(display("DAG operation cancelled: {operation}"))]
    Cancelled {
        /// Which call was in flight.
        operation: String,
    },
}

/// Raw-block surface of the remote DAG node API.
///
/// Implementations must be content-addressed: `block_put` returns the CID
/// of exactly the bytes it stored, and `block_get` returns bytes whose
/// recomputed CID equals the requested one. [`DagClient`] re-verifies the
/// latter on every fetch regardless.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store an opaque block, returning its CID.
    async fn block_put(&self, data: Bytes) -> Result<Cid, DagError>;

    /// Fetch a block by CID.
    async fn block_get(&self, cid: &Cid) -> Result<Bytes, DagError>;

    /// Check whether the node holds a block.
    async fn block_has(&self, cid: &Cid) -> Result<bool, DagError>;
}
