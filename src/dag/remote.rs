//! Remote block store over the node RPC transport.
//!
//! Talks to the DAG node through an iroh connection: one bidirectional
//! stream per call, length-prefixed postcard frames, fixed deadline. A
//! deadline that fires surfaces as [`DagError::Cancelled`]; any transport
//! failure surfaces as [`DagError::Unavailable`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use iroh::{Endpoint, PublicKey};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use super::{BlockStore, DagError};
use crate::cid::Cid;

/// ALPN identifier for the DAG node block protocol.
pub const DAG_ALPN: &[u8] = b"madrone/dag/1";

/// Deadline applied to every node round-trip.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Request frame sent to the DAG node.
#[derive(Debug, Serialize, Deserialize)]
pub enum NodeRequest {
    /// Store a raw block.
    BlockPut {
        /// Block bytes.
        data: Vec<u8>,
    },
    /// Fetch a raw block.
    BlockGet {
        /// CID of the wanted block.
        cid: String,
    },
    /// Ask whether the node holds a block.
    BlockHas {
        /// CID to probe.
        cid: String,
    },
}

/// Response frame received from the DAG node.
#[derive(Debug, Serialize, Deserialize)]
pub enum NodeResponse {
    /// Block stored; its CID.
    BlockPut {
        /// CID of the stored bytes.
        cid: String,
    },
    /// Block fetched, or `None` if the node does not hold it.
    BlockGet {
        /// Block bytes when present.
        data: Option<Vec<u8>>,
    },
    /// Presence answer.
    BlockHas {
        /// Whether the node holds the block.
        present: bool,
    },
    /// Node-side failure.
    Error {
        /// Failure detail.
        message: String,
    },
}

/// Block store backed by a remote DAG node reached over iroh.
pub struct RemoteBlockStore {
    /// Endpoint used to dial the node.
    endpoint: Arc<Endpoint>,
    /// Public key of the DAG node.
    node: PublicKey,
}

impl RemoteBlockStore {
    /// Create a client for the node with the given public key.
    pub fn new(endpoint: Arc<Endpoint>, node: PublicKey) -> Self {
        Self { endpoint, node }
    }

    /// Send one request frame and read one response frame.
    async fn send_rpc(&self, request: NodeRequest) -> Result<NodeResponse, DagError> {
        let operation = match &request {
            NodeRequest::BlockPut { .. } => "BlockPut",
            NodeRequest::BlockGet { .. } => "BlockGet",
            NodeRequest::BlockHas { .. } => "BlockHas",
        };

        let connection = timeout(RPC_TIMEOUT, self.endpoint.connect(self.node, DAG_ALPN))
            .await
            .map_err(|_| DagError::Cancelled {
                operation: operation.to_string(),
            })?
            .map_err(|e| DagError::Unavailable {
                message: format!("connection failed: {}", e),
            })?;

        let (mut send, mut recv) =
            connection
                .open_bi()
                .await
                .map_err(|e| DagError::Unavailable {
                    message: format!("failed to open stream: {}", e),
                })?;

        let request_bytes =
            postcard::to_allocvec(&request).map_err(|e| DagError::Unavailable {
                message: format!("failed to serialize request: {}", e),
            })?;

        let len_bytes = (request_bytes.len() as u32).to_be_bytes();
        send.write_all(&len_bytes)
            .await
            .map_err(|e| DagError::Unavailable {
                message: format!("failed to send request length: {}", e),
            })?;
        send.write_all(&request_bytes)
            .await
            .map_err(|e| DagError::Unavailable {
                message: format!("failed to send request: {}", e),
            })?;
        send.finish().map_err(|e| DagError::Unavailable {
            message: format!("failed to finish send: {}", e),
        })?;

        let mut len_buf = [0u8; 4];
        timeout(RPC_TIMEOUT, recv.read_exact(&mut len_buf))
            .await
            .map_err(|_| DagError::Cancelled {
                operation: operation.to_string(),
            })?
            .map_err(|e| DagError::Unavailable {
                message: format!("failed to read response length: {}", e),
            })?;
        let response_len = u32::from_be_bytes(len_buf) as usize;

        let mut response_bytes = vec![0u8; response_len];
        timeout(RPC_TIMEOUT, recv.read_exact(&mut response_bytes))
            .await
            .map_err(|_| DagError::Cancelled {
                operation: operation.to_string(),
            })?
            .map_err(|e| DagError::Unavailable {
                message: format!("failed to read response: {}", e),
            })?;

        debug!(operation, response_len, "node rpc round-trip complete");

        postcard::from_bytes(&response_bytes).map_err(|e| DagError::Unavailable {
            message: format!("failed to deserialize response: {}", e),
        })
    }
}

#[async_trait]
impl BlockStore for RemoteBlockStore {
    async fn block_put(&self, data: Bytes) -> Result<Cid, DagError> {
        let response = self
            .send_rpc(NodeRequest::BlockPut {
                data: data.to_vec(),
            })
            .await?;
        match response {
            NodeResponse::BlockPut { cid } => Ok(Cid::from(cid)),
            NodeResponse::Error { message } => Err(DagError::Unavailable { message }),
            other => Err(DagError::Unavailable {
                message: format!("unexpected response to BlockPut: {:?}", other),
            }),
        }
    }

    async fn block_get(&self, cid: &Cid) -> Result<Bytes, DagError> {
        let response = self
            .send_rpc(NodeRequest::BlockGet {
                cid: cid.as_str().to_string(),
            })
            .await?;
        match response {
            NodeResponse::BlockGet { data: Some(data) } => Ok(Bytes::from(data)),
            NodeResponse::BlockGet { data: None } => {
                Err(DagError::NotFound { cid: cid.clone() })
            }
            NodeResponse::Error { message } => Err(DagError::Unavailable { message }),
            other => Err(DagError::Unavailable {
                message: format!("unexpected response to BlockGet: {:?}", other),
            }),
        }
    }

    async fn block_has(&self, cid: &Cid) -> Result<bool, DagError> {
        let response = self
            .send_rpc(NodeRequest::BlockHas {
                cid: cid.as_str().to_string(),
            })
            .await?;
        match response {
            NodeResponse::BlockHas { present } => Ok(present),
            NodeResponse::Error { message } => Err(DagError::Unavailable { message }),
            other => Err(DagError::Unavailable {
                message: format!("unexpected response to BlockHas: {:?}", other),
            }),
        }
    }
}
