//! Ledger engine integration tests.
//!
//! Exercises ordering and concurrency guarantees through the public
//! engine API: linearizable per-bucket writes, deadlock-free opposing
//! copies, and persistence across engine restarts.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use madrone::ledger::PutObjectOptions;
use madrone::{LedgerEngine, MemoryBlockStore, MemoryIndexStore};

async fn test_engine() -> Arc<LedgerEngine> {
    Arc::new(
        LedgerEngine::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryIndexStore::new()),
            true,
        )
        .await
        .unwrap(),
    )
}

#[tokio::test]
async fn concurrent_puts_settle_on_one_payload() {
    let engine = test_engine().await;
    engine.create_bucket("b", "us-east-1").await.unwrap();

    let payloads: Vec<Vec<u8>> = (0..16u8).map(|i| format!("payload-{}", i).into_bytes()).collect();

    let mut tasks = Vec::new();
    for payload in &payloads {
        let engine = engine.clone();
        let payload = payload.clone();
        tasks.push(tokio::spawn(async move {
            engine
                .put_object("b", "contested", Bytes::from(payload), PutObjectOptions::default())
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let (_, data) = engine.get_object("b", "contested").await.unwrap();
    assert!(
        payloads.iter().any(|p| p.as_slice() == data.as_ref()),
        "final value must be one of the written payloads"
    );
}

#[tokio::test]
async fn write_is_visible_to_subsequent_readers_on_other_tasks() {
    let engine = test_engine().await;
    engine.create_bucket("b", "us-east-1").await.unwrap();
    engine
        .put_object("b", "k", Bytes::from_static(b"committed"), PutObjectOptions::default())
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let (_, data) = engine.get_object("b", "k").await.unwrap();
            assert_eq!(data.as_ref(), b"committed");
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn opposing_copies_terminate() {
    let engine = test_engine().await;
    engine.create_bucket("a", "us-east-1").await.unwrap();
    engine.create_bucket("b", "us-east-1").await.unwrap();
    engine
        .put_object("a", "x", Bytes::from_static(b"ax"), PutObjectOptions::default())
        .await
        .unwrap();
    engine
        .put_object("b", "y", Bytes::from_static(b"by"), PutObjectOptions::default())
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..25 {
        let forward = engine.clone();
        tasks.push(tokio::spawn(async move {
            forward
                .copy_object("a", "x", "b", &format!("x-{}", i))
                .await
                .unwrap();
        }));
        let reverse = engine.clone();
        tasks.push(tokio::spawn(async move {
            reverse
                .copy_object("b", "y", "a", &format!("y-{}", i))
                .await
                .unwrap();
        }));
    }

    tokio::time::timeout(Duration::from_secs(10), async {
        for task in tasks {
            task.await.unwrap();
        }
    })
    .await
    .expect("opposing copies deadlocked");
}

#[tokio::test]
async fn distinct_buckets_mutate_independently() {
    let engine = test_engine().await;
    engine.create_bucket("left", "us-east-1").await.unwrap();
    engine.create_bucket("right", "us-east-1").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let engine = engine.clone();
        let bucket = if i % 2 == 0 { "left" } else { "right" };
        tasks.push(tokio::spawn(async move {
            engine
                .put_object(
                    bucket,
                    &format!("k-{}", i),
                    Bytes::from(format!("v-{}", i).into_bytes()),
                    PutObjectOptions::default(),
                )
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(engine.list_objects("left", "", "", 0).await.unwrap().len(), 5);
    assert_eq!(engine.list_objects("right", "", "", 0).await.unwrap().len(), 5);
}

#[tokio::test]
async fn namespace_survives_engine_restart() {
    let store = Arc::new(MemoryBlockStore::new());
    let index = Arc::new(MemoryIndexStore::new());

    {
        let engine = LedgerEngine::new(store.clone(), index.clone(), true)
            .await
            .unwrap();
        engine.create_bucket("durable", "us-east-1").await.unwrap();
        engine
            .put_object(
                "durable",
                "k",
                Bytes::from_static(b"kept"),
                PutObjectOptions::default(),
            )
            .await
            .unwrap();
    }

    // A fresh engine over the same stores sees the committed namespace.
    let engine = LedgerEngine::new(store, index, true).await.unwrap();
    let buckets = engine.list_buckets().await.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].name, "durable");

    let (_, data) = engine.get_object("durable", "k").await.unwrap();
    assert_eq!(data.as_ref(), b"kept");
}
