//! In-memory block store.
//!
//! Deterministic, non-persistent [`BlockStore`] used by tests and
//! single-process deployments that have no remote node to talk to.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{BlockStore, DagError};
use crate::cid::Cid;

/// In-memory content-addressed block store.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Bytes>>,
}

impl MemoryBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("block map poisoned").len()
    }

    /// Whether the store holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn block_put(&self, data: Bytes) -> Result<Cid, DagError> {
        let cid = Cid::of(&data);
        self.blocks
            .write()
            .expect("block map poisoned")
            .insert(cid.clone(), data);
        Ok(cid)
    }

    async fn block_get(&self, cid: &Cid) -> Result<Bytes, DagError> {
        self.blocks
            .read()
            .expect("block map poisoned")
            .get(cid)
            .cloned()
            .ok_or_else(|| DagError::NotFound { cid: cid.clone() })
    }

    async fn block_has(&self, cid: &Cid) -> Result<bool, DagError> {
        Ok(self
            .blocks
            .read()
            .expect("block map poisoned")
            .contains_key(cid))
    }
}
