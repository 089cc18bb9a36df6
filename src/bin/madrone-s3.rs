//! madrone S3 server binary.
//!
//! Serves the S3 API over HTTP, backed by the ledger engine. Blocks live
//! in a remote DAG node when one is configured, otherwise in an in-memory
//! store; the local index persists to redb unless `--ephemeral` is set.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use s3s::service::S3ServiceBuilder;
use tokio::net::TcpListener;
use tracing::info;

use madrone::config::GatewayConfig;
use madrone::{
    BlockStore, IndexStore, LedgerEngine, MadroneS3Service, MemoryBlockStore, MemoryIndexStore,
    RedbIndexStore, RemoteBlockStore,
};

/// madrone S3 server - S3-compatible gateway over a content-addressed DAG store.
#[derive(Parser, Debug)]
#[command(name = "madrone-s3")]
#[command(about = "S3-compatible gateway persisting to a content-addressed DAG store")]
struct Args {
    /// HTTP address to bind for the S3 API (overrides MADRONE_S3_ADDR).
    #[arg(long)]
    s3_addr: Option<String>,

    /// Path of the embedded index database (overrides MADRONE_INDEX_PATH).
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Keep the index in memory instead of on disk.
    #[arg(long)]
    ephemeral: bool,

    /// Public key of the remote DAG node (overrides MADRONE_DAG_NODE).
    /// Without one, blocks are kept in an in-process store.
    #[arg(long)]
    dag_node: Option<String>,

    /// Leave record timestamps zero so record CIDs are reproducible.
    #[arg(long)]
    test_mode: bool,

    /// Log level.
    #[arg(long, default_value = "info", env = "MADRONE_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = GatewayConfig::load()?;
    let s3_addr = args.s3_addr.unwrap_or(config.network.s3_addr);
    let index_path = args.index_path.unwrap_or(config.storage.index_path);
    let dag_node = args.dag_node.or(config.dag.node_key);

    info!(s3_addr = %s3_addr, "starting madrone S3 gateway");

    let blocks: Arc<dyn BlockStore> = match &dag_node {
        Some(key) => {
            let node = iroh::PublicKey::from_str(key).context("invalid DAG node public key")?;
            let endpoint = iroh::Endpoint::builder()
                .bind()
                .await
                .context("failed to bind iroh endpoint")?;
            info!(node = %node, "using remote DAG node");
            Arc::new(RemoteBlockStore::new(Arc::new(endpoint), node))
        }
        None => {
            info!("no DAG node configured, using in-memory block store");
            Arc::new(MemoryBlockStore::new())
        }
    };

    let index: Arc<dyn IndexStore> = if args.ephemeral {
        Arc::new(MemoryIndexStore::new())
    } else {
        if let Some(parent) = index_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create index directory")?;
        }
        Arc::new(RedbIndexStore::open(&index_path)?)
    };

    let engine = Arc::new(LedgerEngine::new(blocks, index, args.test_mode).await?);
    let service = S3ServiceBuilder::new(MadroneS3Service::new(engine)).build();
    let service = service.into_shared();

    let s3_addr: SocketAddr = s3_addr.parse().context("invalid S3 address")?;
    let listener = TcpListener::bind(s3_addr)
        .await
        .context("failed to bind S3 listener")?;
    info!("S3 API listening on http://{}", s3_addr);

    let http_server = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());

    loop {
        let (socket, _) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = ctrl_c.as_mut() => break,
        };
        let conn = http_server.serve_connection(TokioIo::new(socket), service.clone());
        let conn = graceful.watch(conn.into_owned());
        tokio::spawn(async move {
            let _ = conn.await;
        });
    }

    info!("shutdown signal received, draining connections");
    graceful.shutdown().await;
    info!("gateway shutdown complete");
    Ok(())
}
