//! CID-verified block and record round-trips.

use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use tracing::{debug, warn};

use super::{BlockStore, DagError};
use crate::cid::Cid;

/// Client for saving and loading blocks and serialized records.
///
/// Wraps any [`BlockStore`] and enforces the integrity contract: every
/// fetched block is re-hashed and compared against the requested CID
/// before it is handed to the caller. Records are encoded with their
/// frozen protobuf field tags, so identical records always produce
/// identical blocks and therefore identical CIDs.
#[derive(Clone)]
pub struct DagClient {
    store: Arc<dyn BlockStore>,
}

impl DagClient {
    /// Create a client over the given block store.
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self { store }
    }

    /// Store an opaque byte block, returning its CID.
    pub async fn save_bytes(&self, data: Bytes) -> Result<Cid, DagError> {
        let size = data.len();
        let cid = self.store.block_put(data).await?;
        debug!(cid = %cid, size, "block stored");
        Ok(cid)
    }

    /// Fetch a byte block, verifying it hashes to the requested CID.
    pub async fn load_bytes(&self, cid: &Cid) -> Result<Bytes, DagError> {
        let data = self.store.block_get(cid).await?;
        let actual = Cid::of(&data);
        if actual != *cid {
            warn!(requested = %cid, actual = %actual, "block failed integrity check");
            return Err(DagError::CidMismatch {
                requested: cid.clone(),
                actual,
            });
        }
        Ok(data)
    }

    /// Check whether the store holds a block.
    pub async fn has_bytes(&self, cid: &Cid) -> Result<bool, DagError> {
        self.store.block_has(cid).await
    }

    /// Serialize a record and store it as a single block.
    pub async fn save_record<M: Message>(&self, record: &M) -> Result<Cid, DagError> {
        let bytes = record.encode_to_vec();
        self.save_bytes(Bytes::from(bytes)).await
    }

    /// Load and decode a record block.
    pub async fn load_record<M: Message + Default>(&self, cid: &Cid) -> Result<M, DagError> {
        let bytes = self.load_bytes(cid).await?;
        M::decode(bytes.as_ref()).map_err(|e| DagError::Corrupt {
            cid: cid.clone(),
            message: e.to_string(),
        })
    }
}
