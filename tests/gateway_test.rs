//! S3 gateway integration tests.
//!
//! Drives the s3s service surface end to end against an in-memory block
//! store and index: bucket lifecycle, object round-trips, listings,
//! copies, batch deletes, ranged reads, and the multipart lifecycle.

use std::sync::Arc;

use futures::TryStreamExt;
use madrone::{LedgerEngine, MadroneS3Service, MemoryBlockStore, MemoryIndexStore};
use s3s::dto::*;
use s3s::{S3Request, S3};

/// Build a gateway over fresh in-memory stores.
async fn create_test_service() -> MadroneS3Service {
    let engine = LedgerEngine::new(
        Arc::new(MemoryBlockStore::new()),
        Arc::new(MemoryIndexStore::new()),
        true,
    )
    .await
    .unwrap();
    MadroneS3Service::new(Arc::new(engine))
}

fn streaming_blob(data: &[u8]) -> StreamingBlob {
    let bytes = bytes::Bytes::copy_from_slice(data);
    StreamingBlob::wrap(futures::stream::once(async move {
        Ok::<_, std::io::Error>(bytes)
    }))
}

async fn read_blob(blob: StreamingBlob) -> Vec<u8> {
    blob.try_fold(Vec::new(), |mut acc, chunk| async move {
        acc.extend_from_slice(&chunk);
        Ok(acc)
    })
    .await
    .unwrap()
}

async fn create_bucket(service: &MadroneS3Service, name: &str) {
    let input = CreateBucketInput::builder()
        .bucket(name.to_string())
        .build()
        .unwrap();
    service
        .create_bucket(S3Request::new(input))
        .await
        .unwrap();
}

async fn put_object(service: &MadroneS3Service, bucket: &str, key: &str, data: &[u8]) -> String {
    let input = PutObjectInput::builder()
        .bucket(bucket.to_string())
        .key(key.to_string())
        .body(Some(streaming_blob(data)))
        .build()
        .unwrap();
    let resp = service.put_object(S3Request::new(input)).await.unwrap();
    resp.output.e_tag.unwrap()
}

async fn get_object_bytes(service: &MadroneS3Service, bucket: &str, key: &str) -> Vec<u8> {
    let input = GetObjectInput::builder()
        .bucket(bucket.to_string())
        .key(key.to_string())
        .build()
        .unwrap();
    let resp = service.get_object(S3Request::new(input)).await.unwrap();
    read_blob(resp.output.body.unwrap()).await
}

// ===== Bucket scenarios =====

#[tokio::test]
async fn head_bucket_after_create() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;

    let head = HeadBucketInput::builder()
        .bucket("bucket1".to_string())
        .build()
        .unwrap();
    assert!(service.head_bucket(S3Request::new(head)).await.is_ok());

    let missing = HeadBucketInput::builder()
        .bucket("bucket2".to_string())
        .build()
        .unwrap();
    assert!(service.head_bucket(S3Request::new(missing)).await.is_err());
}

#[tokio::test]
async fn create_existing_bucket_fails() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;

    let input = CreateBucketInput::builder()
        .bucket("bucket1".to_string())
        .build()
        .unwrap();
    assert!(service.create_bucket(S3Request::new(input)).await.is_err());
}

#[tokio::test]
async fn list_buckets_contains_created() {
    let service = create_test_service().await;
    create_bucket(&service, "beta").await;
    create_bucket(&service, "alpha").await;

    let input = ListBucketsInput::builder().build().unwrap();
    let resp = service.list_buckets(S3Request::new(input)).await.unwrap();
    let names: Vec<String> = resp
        .output
        .buckets
        .unwrap()
        .into_iter()
        .filter_map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
}

#[tokio::test]
async fn delete_bucket_refuses_when_not_empty() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    put_object(&service, "bucket1", "file.txt", b"data").await;

    let delete = DeleteBucketInput::builder()
        .bucket("bucket1".to_string())
        .build()
        .unwrap();
    assert!(service.delete_bucket(S3Request::new(delete)).await.is_err());

    let del_obj = DeleteObjectInput::builder()
        .bucket("bucket1".to_string())
        .key("file.txt".to_string())
        .build()
        .unwrap();
    service.delete_object(S3Request::new(del_obj)).await.unwrap();

    let delete = DeleteBucketInput::builder()
        .bucket("bucket1".to_string())
        .build()
        .unwrap();
    service.delete_bucket(S3Request::new(delete)).await.unwrap();
}

// ===== Object scenarios =====

#[tokio::test]
async fn put_get_head_round_trip() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    put_object(&service, "bucket1", "k", b"hello").await;

    assert_eq!(get_object_bytes(&service, "bucket1", "k").await, b"hello");

    let head = HeadObjectInput::builder()
        .bucket("bucket1".to_string())
        .key("k".to_string())
        .build()
        .unwrap();
    let resp = service.head_object(S3Request::new(head)).await.unwrap();
    assert_eq!(resp.output.content_length, Some(5));
}

#[tokio::test]
async fn put_overwrites_previous_value() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    put_object(&service, "bucket1", "k", b"first").await;
    put_object(&service, "bucket1", "k", b"second").await;

    assert_eq!(get_object_bytes(&service, "bucket1", "k").await, b"second");
}

#[tokio::test]
async fn get_missing_object_is_no_such_key() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;

    let input = GetObjectInput::builder()
        .bucket("bucket1".to_string())
        .key("ghost".to_string())
        .build()
        .unwrap();
    let err = service.get_object(S3Request::new(input)).await.unwrap_err();
    assert_eq!(err.code(), &s3s::S3ErrorCode::NoSuchKey);
}

#[tokio::test]
async fn listing_is_sorted() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    put_object(&service, "bucket1", "a", b"A").await;
    put_object(&service, "bucket1", "c", b"C").await;
    put_object(&service, "bucket1", "b", b"B").await;

    let input = ListObjectsV2Input::builder()
        .bucket("bucket1".to_string())
        .build()
        .unwrap();
    let resp = service.list_objects_v2(S3Request::new(input)).await.unwrap();
    let keys: Vec<String> = resp
        .output
        .contents
        .unwrap()
        .into_iter()
        .filter_map(|o| o.key)
        .collect();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
}

#[tokio::test]
async fn listing_pages_with_continuation_token() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    for key in ["a", "b", "c", "d", "e"] {
        put_object(&service, "bucket1", key, b"v").await;
    }

    let first = ListObjectsV2Input::builder()
        .bucket("bucket1".to_string())
        .max_keys(Some(2))
        .build()
        .unwrap();
    let resp = service.list_objects_v2(S3Request::new(first)).await.unwrap();
    assert_eq!(resp.output.is_truncated, Some(true));
    let token = resp.output.next_continuation_token.clone().unwrap();
    assert_eq!(token, "b");

    let second = ListObjectsV2Input::builder()
        .bucket("bucket1".to_string())
        .max_keys(Some(2))
        .continuation_token(Some(token))
        .build()
        .unwrap();
    let resp = service
        .list_objects_v2(S3Request::new(second))
        .await
        .unwrap();
    let keys: Vec<String> = resp
        .output
        .contents
        .unwrap()
        .into_iter()
        .filter_map(|o| o.key)
        .collect();
    assert_eq!(keys, vec!["c".to_string(), "d".to_string()]);
}

#[tokio::test]
async fn copy_preserves_content_and_source() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    let src_etag = put_object(&service, "bucket1", "x", b"1").await;

    let input = CopyObjectInput::builder()
        .bucket("bucket1".to_string())
        .key("y".to_string())
        .copy_source(CopySource::Bucket {
            bucket: "bucket1".into(),
            key: "x".into(),
            version_id: None,
        })
        .build()
        .unwrap();
    let resp = service.copy_object(S3Request::new(input)).await.unwrap();
    let copy_etag = resp.output.copy_object_result.unwrap().e_tag.unwrap();

    // Content-addressed: same bytes, same data hash, same etag.
    assert_eq!(copy_etag, src_etag);
    assert_eq!(get_object_bytes(&service, "bucket1", "y").await, b"1");
    assert_eq!(get_object_bytes(&service, "bucket1", "x").await, b"1");
}

#[tokio::test]
async fn batch_delete_reports_missing_keys() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    put_object(&service, "bucket1", "present", b"x").await;

    let input = DeleteObjectsInput::builder()
        .bucket("bucket1".to_string())
        .delete(
            Delete::builder()
                .objects(vec![
                    ObjectIdentifier::builder()
                        .key("present".to_string())
                        .build()
                        .unwrap(),
                    ObjectIdentifier::builder()
                        .key("ghost".to_string())
                        .build()
                        .unwrap(),
                ])
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let resp = service.delete_objects(S3Request::new(input)).await.unwrap();

    let deleted: Vec<String> = resp
        .output
        .deleted
        .unwrap()
        .into_iter()
        .filter_map(|d| d.key)
        .collect();
    assert_eq!(deleted, vec!["present".to_string()]);

    let errors = resp.output.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key.as_deref(), Some("ghost"));
    assert_eq!(errors[0].code.as_deref(), Some("NoSuchKey"));
}

#[tokio::test]
async fn ranged_get_returns_partial_content() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;
    put_object(&service, "bucket1", "k", b"hello world").await;

    let input = GetObjectInput::builder()
        .bucket("bucket1".to_string())
        .key("k".to_string())
        .range(Some(Range::Int {
            first: 6,
            last: Some(10),
        }))
        .build()
        .unwrap();
    let resp = service.get_object(S3Request::new(input)).await.unwrap();
    assert_eq!(
        resp.output.content_range.as_deref(),
        Some("bytes 6-10/11")
    );
    assert_eq!(read_blob(resp.output.body.unwrap()).await, b"world");

    let unsatisfiable = GetObjectInput::builder()
        .bucket("bucket1".to_string())
        .key("k".to_string())
        .range(Some(Range::Int {
            first: 100,
            last: None,
        }))
        .build()
        .unwrap();
    let err = service
        .get_object(S3Request::new(unsatisfiable))
        .await
        .unwrap_err();
    assert_eq!(err.code(), &s3s::S3ErrorCode::InvalidRange);
}

// ===== Multipart scenarios =====

#[tokio::test]
async fn multipart_upload_lifecycle() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;

    let init = CreateMultipartUploadInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .build()
        .unwrap();
    let resp = service
        .create_multipart_upload(S3Request::new(init))
        .await
        .unwrap();
    let upload_id = resp.output.upload_id.unwrap();

    // Parts arrive out of order.
    let part2 = UploadPartInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id.clone())
        .part_number(2)
        .body(Some(streaming_blob(b"world")))
        .build()
        .unwrap();
    let etag2 = service
        .upload_part(S3Request::new(part2))
        .await
        .unwrap()
        .output
        .e_tag
        .unwrap();

    let part1 = UploadPartInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id.clone())
        .part_number(1)
        .body(Some(streaming_blob(b"hello ")))
        .build()
        .unwrap();
    let etag1 = service
        .upload_part(S3Request::new(part1))
        .await
        .unwrap()
        .output
        .e_tag
        .unwrap();

    let complete = CompleteMultipartUploadInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id.clone())
        .multipart_upload(Some(
            CompletedMultipartUpload::builder()
                .parts(Some(vec![
                    CompletedPart::builder()
                        .part_number(Some(1))
                        .e_tag(Some(etag1))
                        .build()
                        .unwrap(),
                    CompletedPart::builder()
                        .part_number(Some(2))
                        .e_tag(Some(etag2))
                        .build()
                        .unwrap(),
                ]))
                .build()
                .unwrap(),
        ))
        .build()
        .unwrap();
    service
        .complete_multipart_upload(S3Request::new(complete))
        .await
        .unwrap();

    assert_eq!(
        get_object_bytes(&service, "bucket1", "big").await,
        b"hello world"
    );
}

#[tokio::test]
async fn multipart_abort_invalidates_upload_id() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;

    let init = CreateMultipartUploadInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .build()
        .unwrap();
    let upload_id = service
        .create_multipart_upload(S3Request::new(init))
        .await
        .unwrap()
        .output
        .upload_id
        .unwrap();

    let part = UploadPartInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id.clone())
        .part_number(1)
        .body(Some(streaming_blob(b"data")))
        .build()
        .unwrap();
    service.upload_part(S3Request::new(part)).await.unwrap();

    let abort = AbortMultipartUploadInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id.clone())
        .build()
        .unwrap();
    service
        .abort_multipart_upload(S3Request::new(abort))
        .await
        .unwrap();

    let late_part = UploadPartInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id)
        .part_number(2)
        .body(Some(streaming_blob(b"late")))
        .build()
        .unwrap();
    let err = service
        .upload_part(S3Request::new(late_part))
        .await
        .unwrap_err();
    assert_eq!(err.code(), &s3s::S3ErrorCode::NoSuchUpload);
}

#[tokio::test]
async fn list_parts_and_uploads() {
    let service = create_test_service().await;
    create_bucket(&service, "bucket1").await;

    let init = CreateMultipartUploadInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .build()
        .unwrap();
    let upload_id = service
        .create_multipart_upload(S3Request::new(init))
        .await
        .unwrap()
        .output
        .upload_id
        .unwrap();

    let part = UploadPartInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id.clone())
        .part_number(1)
        .body(Some(streaming_blob(b"chunk")))
        .build()
        .unwrap();
    service.upload_part(S3Request::new(part)).await.unwrap();

    let list_uploads = ListMultipartUploadsInput::builder()
        .bucket("bucket1".to_string())
        .build()
        .unwrap();
    let resp = service
        .list_multipart_uploads(S3Request::new(list_uploads))
        .await
        .unwrap();
    let uploads = resp.output.uploads.unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].upload_id.as_deref(), Some(upload_id.as_str()));

    let list_parts = ListPartsInput::builder()
        .bucket("bucket1".to_string())
        .key("big".to_string())
        .upload_id(upload_id)
        .build()
        .unwrap();
    let resp = service.list_parts(S3Request::new(list_parts)).await.unwrap();
    let parts = resp.output.parts.unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].part_number, Some(1));
    assert_eq!(parts[0].size, Some(5));
}
