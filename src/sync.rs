//! DAG-syncer adapter.
//!
//! The replication layer drives convergence by walking CIDs; it needs
//! four operations over the same node API the engine uses, plus a local
//! "seen" set so it can tell which blocks it has already processed. The
//! seen set lives in the index store under its own prefix. `remove` only
//! clears the local mark; blocks are never deleted from the node.

use std::sync::Arc;

use bytes::Bytes;
use snafu::Snafu;

use crate::cid::Cid;
use crate::dag::{DagClient, DagError};
use crate::index::{IndexError, IndexStore};

/// Index key prefix for the seen-CIDs set.
const SEEN_PREFIX: &str = "seen/";

/// Errors from syncer operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    /// DAG store failure.
    #[snafu(display("DAG store error: {source}"))]
    Dag {
        /// Underlying DAG error.
        source: DagError,
    },

    /// Index store failure.
    #[snafu(display("index store error: {source}"))]
    Index {
        /// Underlying index error.
        source: IndexError,
    },
}

impl From<DagError> for SyncError {
    fn from(source: DagError) -> Self {
        SyncError::Dag { source }
    }
}

impl From<IndexError> for SyncError {
    fn from(source: IndexError) -> Self {
        SyncError::Index { source }
    }
}

/// Block-level syncer handed to the replication layer.
pub struct DagSyncer {
    dag: DagClient,
    index: Arc<dyn IndexStore>,
}

impl DagSyncer {
    /// Create a syncer over the gateway's DAG client and index store.
    pub fn new(dag: DagClient, index: Arc<dyn IndexStore>) -> Self {
        Self { dag, index }
    }

    fn seen_key(cid: &Cid) -> String {
        format!("{}{}", SEEN_PREFIX, cid)
    }

    /// Fetch a block and mark it seen.
    pub async fn get(&self, cid: &Cid) -> Result<Bytes, SyncError> {
        let data = self.dag.load_bytes(cid).await?;
        self.index.put(&Self::seen_key(cid), "").await?;
        Ok(data)
    }

    /// Store a block and mark it seen.
    pub async fn add(&self, data: Bytes) -> Result<Cid, SyncError> {
        let cid = self.dag.save_bytes(data).await?;
        self.index.put(&Self::seen_key(&cid), "").await?;
        Ok(cid)
    }

    /// Whether a block has been processed locally.
    pub async fn has(&self, cid: &Cid) -> Result<bool, SyncError> {
        Ok(self.index.has(&Self::seen_key(cid)).await?)
    }

    /// Forget a block locally. The node keeps the block; removing an
    /// unseen CID succeeds.
    pub async fn remove(&self, cid: &Cid) -> Result<(), SyncError> {
        self.index.delete(&Self::seen_key(cid)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::MemoryBlockStore;
    use crate::index::MemoryIndexStore;

    fn syncer() -> DagSyncer {
        let dag = DagClient::new(Arc::new(MemoryBlockStore::new()));
        DagSyncer::new(dag, Arc::new(MemoryIndexStore::new()))
    }

    #[tokio::test]
    async fn add_marks_seen() {
        let syncer = syncer();
        let cid = syncer.add(Bytes::from_static(b"node")).await.unwrap();
        assert!(syncer.has(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn get_marks_seen_and_returns_bytes() {
        let syncer = syncer();
        let cid = syncer.add(Bytes::from_static(b"node")).await.unwrap();
        syncer.remove(&cid).await.unwrap();
        assert!(!syncer.has(&cid).await.unwrap());

        let data = syncer.get(&cid).await.unwrap();
        assert_eq!(data.as_ref(), b"node");
        assert!(syncer.has(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn remove_is_local_only() {
        let syncer = syncer();
        let cid = syncer.add(Bytes::from_static(b"kept")).await.unwrap();
        syncer.remove(&cid).await.unwrap();
        // The block itself is still fetchable from the node.
        assert_eq!(syncer.get(&cid).await.unwrap().as_ref(), b"kept");
    }

    #[tokio::test]
    async fn remove_unseen_cid_succeeds() {
        let syncer = syncer();
        syncer.remove(&Cid::of(b"never seen")).await.unwrap();
    }
}
