//! S3 service implementation.
//!
//! Maps the S3 verb surface onto the ledger engine. Names are validated
//! here, bodies are read whole (the engine takes complete byte payloads),
//! and every engine error goes through [`to_s3_error`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use futures::stream;
use futures::TryStreamExt;
use s3s::dto::*;
use s3s::{s3_error, S3Request, S3Response, S3};
use tracing::{debug, info};

use super::constants::*;
use super::error::to_s3_error;
use crate::ledger::records::{datetime_from_ms, ObjectInfo};
use crate::ledger::{LedgerEngine, PutObjectOptions};

/// S3 service backed by the ledger engine.
pub struct MadroneS3Service {
    engine: Arc<LedgerEngine>,
}

impl MadroneS3Service {
    /// Create the service over a shared engine instance.
    pub fn new(engine: Arc<LedgerEngine>) -> Self {
        Self { engine }
    }

    /// Validate a bucket name against the S3 naming rules.
    fn validate_bucket_name(name: &str) -> Result<(), String> {
        let len = name.len();
        if !(MIN_BUCKET_NAME_LENGTH..=MAX_BUCKET_NAME_LENGTH).contains(&len) {
            return Err(format!(
                "bucket name must be between {} and {} characters",
                MIN_BUCKET_NAME_LENGTH, MAX_BUCKET_NAME_LENGTH
            ));
        }
        for ch in name.chars() {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' && ch != '.' {
                return Err(
                    "bucket names may only contain lowercase letters, digits, hyphens, and periods"
                        .to_string(),
                );
            }
        }
        let first = name.chars().next().unwrap_or(' ');
        let last = name.chars().last().unwrap_or(' ');
        if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
            return Err("bucket names must start and end with a letter or digit".to_string());
        }
        Ok(())
    }

    /// Validate an object key.
    fn validate_object_key(key: &str) -> Result<(), String> {
        if key.is_empty() {
            return Err("object key cannot be empty".to_string());
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(format!(
                "object key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        Ok(())
    }
}

/// Convert a record timestamp (Unix milliseconds) to an s3s timestamp.
fn timestamp_from_ms(ms: i64) -> Timestamp {
    Timestamp::from(SystemTime::from(datetime_from_ms(ms)))
}

/// Parse a stored content type string into the dto type.
fn parse_content_type(s: &str) -> Option<ContentType> {
    if s.is_empty() {
        return None;
    }
    s.parse::<mime::Mime>().ok()
}

/// Wrap in-memory bytes as a one-chunk streaming body.
fn bytes_to_streaming_blob(data: Vec<u8>) -> StreamingBlob {
    let bytes = Bytes::from(data);
    let data_stream = stream::once(async move { Ok::<_, std::io::Error>(bytes) });
    StreamingBlob::wrap(data_stream)
}

/// ETags travel quoted on the wire.
fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}

/// Collect a request body into memory, bounded by `limit`.
async fn read_body(
    body: Option<StreamingBlob>,
    content_length: Option<i64>,
    limit: u64,
) -> s3s::S3Result<Vec<u8>> {
    let initial_capacity = content_length.map(|len| len as usize).unwrap_or(0);
    let data = match body {
        Some(stream) => stream
            .try_fold(
                Vec::with_capacity(initial_capacity),
                |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                },
            )
            .await
            .map_err(|e| s3_error!(InternalError, "Failed to read request body: {:?}", e))?,
        None => Vec::new(),
    };
    if data.len() as u64 > limit {
        return Err(s3_error!(
            EntityTooLarge,
            "Payload size {} exceeds maximum {}",
            data.len(),
            limit
        ));
    }
    Ok(data)
}

/// Resolved byte range for partial content requests, inclusive on both ends.
struct ResolvedRange {
    start: u64,
    end: u64,
}

/// Resolve an HTTP Range header against the object size.
fn resolve_range(range: &Range, object_size: u64) -> Result<ResolvedRange, String> {
    if object_size == 0 {
        return Err("cannot request a range of an empty object".to_string());
    }
    match range {
        Range::Int { first, last } => {
            if *first >= object_size {
                return Err(format!(
                    "start position {} >= object size {}",
                    first, object_size
                ));
            }
            let end = match last {
                Some(l) => (*l).min(object_size - 1),
                None => object_size - 1,
            };
            if end < *first {
                return Err(format!("end position {} < start position {}", end, first));
            }
            Ok(ResolvedRange { start: *first, end })
        }
        Range::Suffix { length } => {
            if *length == 0 {
                return Err("suffix length cannot be zero".to_string());
            }
            let start = object_size.saturating_sub(*length);
            Ok(ResolvedRange {
                start,
                end: object_size - 1,
            })
        }
    }
}

/// Format a Content-Range header value.
fn format_content_range(start: u64, end: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", start, end, total)
}

/// Build engine put options from request header fields.
fn put_options(
    content_type: Option<ContentType>,
    content_encoding: Option<ContentEncoding>,
    content_language: Option<ContentLanguage>,
    content_disposition: Option<ContentDisposition>,
    metadata: Option<Metadata>,
) -> PutObjectOptions {
    PutObjectOptions {
        content_type: content_type.map(|ct| ct.to_string()),
        content_encoding: content_encoding.map(|s| s.to_string()),
        content_language: content_language.map(|s| s.to_string()),
        content_disposition: content_disposition.map(|s| s.to_string()),
        user_metadata: metadata
            .map(|m| m.into_iter().collect::<BTreeMap<String, String>>())
            .unwrap_or_default(),
    }
}

/// Project an object info record onto a listing entry.
fn object_dto(info: &ObjectInfo) -> Object {
    Object {
        key: Some(info.name.clone()),
        size: Some(info.size),
        e_tag: Some(quote_etag(&info.etag)),
        last_modified: Some(timestamp_from_ms(info.mod_time_ms)),
        storage_class: Some(ObjectStorageClass::from_static(
            ObjectStorageClass::STANDARD,
        )),
        ..Default::default()
    }
}

fn owner_dto() -> Owner {
    Owner {
        display_name: Some("madrone".to_string()),
        id: Some("madrone".to_string()),
    }
}

#[async_trait::async_trait]
impl S3 for MadroneS3Service {
    // ===== Bucket operations =====

    async fn create_bucket(
        &self,
        req: S3Request<CreateBucketInput>,
    ) -> s3s::S3Result<S3Response<CreateBucketOutput>> {
        let bucket = req.input.bucket.as_str();
        info!(bucket, "S3 CreateBucket");

        Self::validate_bucket_name(bucket)
            .map_err(|reason| s3_error!(InvalidBucketName, "{}", reason))?;

        let location = req
            .input
            .create_bucket_configuration
            .and_then(|c| c.location_constraint)
            .map(|l| l.as_str().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        self.engine
            .create_bucket(bucket, &location)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(CreateBucketOutput {
            location: Some(format!("/{}", bucket)),
        }))
    }

    async fn head_bucket(
        &self,
        req: S3Request<HeadBucketInput>,
    ) -> s3s::S3Result<S3Response<HeadBucketOutput>> {
        let bucket = req.input.bucket.as_str();
        debug!(bucket, "S3 HeadBucket");

        let info = self
            .engine
            .get_bucket_info(bucket)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(HeadBucketOutput {
            bucket_region: Some(info.location),
            ..Default::default()
        }))
    }

    async fn delete_bucket(
        &self,
        req: S3Request<DeleteBucketInput>,
    ) -> s3s::S3Result<S3Response<DeleteBucketOutput>> {
        let bucket = req.input.bucket.as_str();
        info!(bucket, "S3 DeleteBucket");

        self.engine
            .delete_bucket(bucket)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(DeleteBucketOutput {}))
    }

    async fn list_buckets(
        &self,
        _req: S3Request<ListBucketsInput>,
    ) -> s3s::S3Result<S3Response<ListBucketsOutput>> {
        debug!("S3 ListBuckets");

        let infos = self.engine.list_buckets().await.map_err(to_s3_error)?;
        let buckets: Vec<Bucket> = infos
            .into_iter()
            .map(|info| Bucket {
                name: Some(info.name),
                creation_date: Some(timestamp_from_ms(info.created_ms)),
                bucket_region: Some(info.location),
            })
            .collect();

        debug!(count = buckets.len(), "ListBuckets complete");

        Ok(S3Response::new(ListBucketsOutput {
            buckets: Some(buckets),
            owner: Some(owner_dto()),
            continuation_token: None,
            prefix: None,
        }))
    }

    // ===== Object operations =====

    async fn put_object(
        &self,
        req: S3Request<PutObjectInput>,
    ) -> s3s::S3Result<S3Response<PutObjectOutput>> {
        let input = req.input;
        let bucket = input.bucket.as_str();
        let key = input.key.as_str();
        info!(bucket, key, "S3 PutObject");

        Self::validate_object_key(key)
            .map_err(|reason| s3_error!(InvalidArgument, "Invalid object key: {}", reason))?;

        let body = read_body(input.body, input.content_length, MAX_OBJECT_SIZE_BYTES).await?;
        let opts = put_options(
            input.content_type,
            input.content_encoding,
            input.content_language,
            input.content_disposition,
            input.metadata,
        );

        let info = self
            .engine
            .put_object(bucket, key, Bytes::from(body), opts)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(PutObjectOutput {
            e_tag: Some(quote_etag(&info.etag)),
            ..Default::default()
        }))
    }

    async fn get_object(
        &self,
        req: S3Request<GetObjectInput>,
    ) -> s3s::S3Result<S3Response<GetObjectOutput>> {
        let bucket = req.input.bucket.as_str();
        let key = req.input.key.as_str();
        let range = req.input.range.as_ref();
        debug!(bucket, key, ?range, "S3 GetObject");

        let (info, data) = self
            .engine
            .get_object(bucket, key)
            .await
            .map_err(to_s3_error)?;

        let resolved = match range {
            Some(r) => Some(
                resolve_range(r, info.size as u64)
                    .map_err(|reason| s3_error!(InvalidRange, "Invalid range: {}", reason))?,
            ),
            None => None,
        };

        let (data, content_length, content_range) = match resolved {
            Some(r) => {
                let start = r.start as usize;
                if start >= data.len() {
                    return Err(s3_error!(
                        InvalidRange,
                        "Range start {} exceeds data length {}",
                        start,
                        data.len()
                    ));
                }
                let end = (r.end as usize).min(data.len() - 1);
                let partial = data[start..=end].to_vec();
                let len = partial.len() as i64;
                let header = format_content_range(start as u64, end as u64, info.size as u64);
                (partial, len, Some(header))
            }
            None => (data.to_vec(), info.size, None),
        };

        Ok(S3Response::new(GetObjectOutput {
            body: Some(bytes_to_streaming_blob(data)),
            content_length: Some(content_length),
            content_type: parse_content_type(&info.content_type),
            content_encoding: (!info.content_encoding.is_empty())
                .then(|| info.content_encoding.clone()),
            content_range,
            accept_ranges: Some("bytes".to_string()),
            e_tag: Some(quote_etag(&info.etag)),
            last_modified: Some(timestamp_from_ms(info.mod_time_ms)),
            metadata: Some(info.user_metadata.clone().into_iter().collect()),
            ..Default::default()
        }))
    }

    async fn head_object(
        &self,
        req: S3Request<HeadObjectInput>,
    ) -> s3s::S3Result<S3Response<HeadObjectOutput>> {
        let bucket = req.input.bucket.as_str();
        let key = req.input.key.as_str();
        debug!(bucket, key, "S3 HeadObject");

        let info = self
            .engine
            .get_object_info(bucket, key)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(HeadObjectOutput {
            content_length: Some(info.size),
            content_type: parse_content_type(&info.content_type),
            accept_ranges: Some("bytes".to_string()),
            e_tag: Some(quote_etag(&info.etag)),
            last_modified: Some(timestamp_from_ms(info.mod_time_ms)),
            metadata: Some(info.user_metadata.clone().into_iter().collect()),
            ..Default::default()
        }))
    }

    async fn copy_object(
        &self,
        req: S3Request<CopyObjectInput>,
    ) -> s3s::S3Result<S3Response<CopyObjectOutput>> {
        let dest_bucket = req.input.bucket.as_str();
        let dest_key = req.input.key.as_str();

        let (src_bucket, src_key) = match &req.input.copy_source {
            CopySource::Bucket {
                bucket,
                key,
                version_id: _,
            } => (bucket.as_ref(), key.as_ref()),
            CopySource::AccessPoint { .. } => {
                return Err(s3_error!(NotImplemented, "Access point copy not supported"));
            }
        };
        info!(src_bucket, src_key, dest_bucket, dest_key, "S3 CopyObject");

        if !self
            .engine
            .bucket_exists(src_bucket)
            .await
            .map_err(to_s3_error)?
        {
            return Err(s3_error!(
                NoSuchBucket,
                "Source bucket '{}' does not exist",
                src_bucket
            ));
        }

        let info = self
            .engine
            .copy_object(src_bucket, src_key, dest_bucket, dest_key)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(CopyObjectOutput {
            copy_object_result: Some(CopyObjectResult {
                e_tag: Some(quote_etag(&info.etag)),
                last_modified: Some(timestamp_from_ms(info.mod_time_ms)),
                ..Default::default()
            }),
            ..Default::default()
        }))
    }

    async fn delete_object(
        &self,
        req: S3Request<DeleteObjectInput>,
    ) -> s3s::S3Result<S3Response<DeleteObjectOutput>> {
        let bucket = req.input.bucket.as_str();
        let key = req.input.key.as_str();
        info!(bucket, key, "S3 DeleteObject");

        self.engine
            .delete_object(bucket, key)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(DeleteObjectOutput::default()))
    }

    async fn delete_objects(
        &self,
        req: S3Request<DeleteObjectsInput>,
    ) -> s3s::S3Result<S3Response<DeleteObjectsOutput>> {
        let bucket = req.input.bucket.as_str();
        let objects = &req.input.delete.objects;
        let quiet = req.input.delete.quiet.unwrap_or(false);
        info!(bucket, count = objects.len(), quiet, "S3 DeleteObjects");

        let names: Vec<String> = objects.iter().map(|o| o.key.to_string()).collect();
        let missing = self
            .engine
            .delete_objects(bucket, &names)
            .await
            .map_err(to_s3_error)?;

        let mut deleted: Vec<DeletedObject> = Vec::with_capacity(names.len());
        let mut errors: Vec<s3s::dto::Error> = Vec::with_capacity(missing.len());
        for name in names {
            if missing.contains(&name) {
                errors.push(s3s::dto::Error {
                    code: Some("NoSuchKey".to_string()),
                    key: Some(name),
                    message: Some("The specified key does not exist".to_string()),
                    version_id: None,
                });
            } else if !quiet {
                deleted.push(DeletedObject {
                    key: Some(name),
                    delete_marker: None,
                    delete_marker_version_id: None,
                    version_id: None,
                });
            }
        }

        Ok(S3Response::new(DeleteObjectsOutput {
            deleted: (!deleted.is_empty()).then_some(deleted),
            errors: (!errors.is_empty()).then_some(errors),
            request_charged: None,
        }))
    }

    async fn list_objects(
        &self,
        req: S3Request<ListObjectsInput>,
    ) -> s3s::S3Result<S3Response<ListObjectsOutput>> {
        let bucket = req.input.bucket.as_str();
        let prefix = req.input.prefix.as_deref().unwrap_or("");
        let marker = req.input.marker.as_deref().unwrap_or("");
        let max_keys = req
            .input
            .max_keys
            .unwrap_or(MAX_LIST_OBJECTS)
            .clamp(0, MAX_LIST_OBJECTS);
        debug!(bucket, prefix, marker, max_keys, "S3 ListObjects");

        // Fetch one extra entry to detect truncation.
        let mut infos = self
            .engine
            .list_objects(bucket, prefix, marker, max_keys as usize + 1)
            .await
            .map_err(to_s3_error)?;
        let is_truncated = infos.len() > max_keys as usize;
        infos.truncate(max_keys as usize);

        let contents: Vec<Object> = infos.iter().map(object_dto).collect();
        let next_marker = if is_truncated {
            contents.last().and_then(|o| o.key.clone())
        } else {
            None
        };

        Ok(S3Response::new(ListObjectsOutput {
            name: Some(bucket.to_string()),
            prefix: req.input.prefix.clone(),
            marker: req.input.marker.clone(),
            delimiter: req.input.delimiter.clone(),
            max_keys: Some(max_keys),
            is_truncated: Some(is_truncated),
            contents: Some(contents),
            next_marker,
            ..Default::default()
        }))
    }

    async fn list_objects_v2(
        &self,
        req: S3Request<ListObjectsV2Input>,
    ) -> s3s::S3Result<S3Response<ListObjectsV2Output>> {
        let bucket = req.input.bucket.as_str();
        let prefix = req.input.prefix.as_deref().unwrap_or("");
        let max_keys = req
            .input
            .max_keys
            .unwrap_or(MAX_LIST_OBJECTS)
            .clamp(0, MAX_LIST_OBJECTS);
        // The continuation token is the last key of the previous page; it
        // takes precedence over start-after.
        let start_after = req
            .input
            .continuation_token
            .as_deref()
            .or(req.input.start_after.as_deref())
            .unwrap_or("");
        debug!(bucket, prefix, start_after, max_keys, "S3 ListObjectsV2");

        let mut infos = self
            .engine
            .list_objects(bucket, prefix, start_after, max_keys as usize + 1)
            .await
            .map_err(to_s3_error)?;
        let is_truncated = infos.len() > max_keys as usize;
        infos.truncate(max_keys as usize);

        let contents: Vec<Object> = infos.iter().map(object_dto).collect();
        let next_continuation_token = if is_truncated {
            contents.last().and_then(|o| o.key.clone())
        } else {
            None
        };
        let key_count = contents.len() as i32;

        Ok(S3Response::new(ListObjectsV2Output {
            name: Some(bucket.to_string()),
            prefix: req.input.prefix.clone(),
            delimiter: req.input.delimiter.clone(),
            max_keys: Some(max_keys),
            is_truncated: Some(is_truncated),
            key_count: Some(key_count),
            contents: Some(contents),
            next_continuation_token,
            continuation_token: req.input.continuation_token.clone(),
            start_after: req.input.start_after.clone(),
            ..Default::default()
        }))
    }

    // ===== Multipart upload operations =====

    async fn create_multipart_upload(
        &self,
        req: S3Request<CreateMultipartUploadInput>,
    ) -> s3s::S3Result<S3Response<CreateMultipartUploadOutput>> {
        let input = req.input;
        let bucket = input.bucket.as_str();
        let key = input.key.as_str();
        info!(bucket, key, "S3 CreateMultipartUpload");

        Self::validate_object_key(key)
            .map_err(|reason| s3_error!(InvalidArgument, "Invalid object key: {}", reason))?;

        let opts = put_options(
            input.content_type,
            input.content_encoding,
            input.content_language,
            input.content_disposition,
            input.metadata,
        );
        let upload_id = self
            .engine
            .new_multipart_upload(bucket, key, opts)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(CreateMultipartUploadOutput {
            bucket: Some(bucket.to_string()),
            key: Some(key.to_string()),
            upload_id: Some(upload_id),
            ..Default::default()
        }))
    }

    async fn upload_part(
        &self,
        req: S3Request<UploadPartInput>,
    ) -> s3s::S3Result<S3Response<UploadPartOutput>> {
        let input = req.input;
        let bucket = input.bucket.as_str();
        let key = input.key.as_str();
        let upload_id = input.upload_id.as_str();
        let part_number = input.part_number;
        info!(bucket, key, upload_id, part_number, "S3 UploadPart");

        if part_number < 1 || part_number > MAX_MULTIPART_PARTS as i32 {
            return Err(s3_error!(
                InvalidArgument,
                "Part number must be between 1 and {}",
                MAX_MULTIPART_PARTS
            ));
        }

        let body = read_body(input.body, input.content_length, MAX_PART_SIZE_BYTES).await?;
        let part = self
            .engine
            .put_object_part(upload_id, part_number, Bytes::from(body))
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(UploadPartOutput {
            e_tag: Some(quote_etag(&part.etag)),
            ..Default::default()
        }))
    }

    async fn complete_multipart_upload(
        &self,
        req: S3Request<CompleteMultipartUploadInput>,
    ) -> s3s::S3Result<S3Response<CompleteMultipartUploadOutput>> {
        let bucket = req.input.bucket.as_str();
        let key = req.input.key.as_str();
        let upload_id = req.input.upload_id.as_str();
        info!(bucket, key, upload_id, "S3 CompleteMultipartUpload");

        let requested_parts = req
            .input
            .multipart_upload
            .as_ref()
            .and_then(|u| u.parts.as_deref())
            .unwrap_or_default();
        if requested_parts.is_empty() {
            return Err(s3_error!(MalformedXML, "No parts specified for completion"));
        }

        let mut parts: Vec<(i32, String)> = Vec::with_capacity(requested_parts.len());
        let mut last_part_number: i32 = 0;
        for completed in requested_parts {
            let part_number = completed
                .part_number
                .ok_or_else(|| s3_error!(InvalidPart, "Part number is required"))?;
            if part_number <= last_part_number {
                return Err(s3_error!(
                    InvalidPartOrder,
                    "Parts must be in ascending order"
                ));
            }
            last_part_number = part_number;
            let etag = completed
                .e_tag
                .as_deref()
                .map(|t| t.trim_matches('"').to_string())
                .unwrap_or_default();
            parts.push((part_number, etag));
        }

        let info = self
            .engine
            .complete_multipart_upload(upload_id, &parts)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(CompleteMultipartUploadOutput {
            bucket: Some(bucket.to_string()),
            key: Some(key.to_string()),
            e_tag: Some(quote_etag(&info.etag)),
            location: Some(format!("/{}/{}", bucket, key)),
            ..Default::default()
        }))
    }

    async fn abort_multipart_upload(
        &self,
        req: S3Request<AbortMultipartUploadInput>,
    ) -> s3s::S3Result<S3Response<AbortMultipartUploadOutput>> {
        let bucket = req.input.bucket.as_str();
        let key = req.input.key.as_str();
        let upload_id = req.input.upload_id.as_str();
        info!(bucket, key, upload_id, "S3 AbortMultipartUpload");

        self.engine
            .abort_multipart_upload(upload_id)
            .await
            .map_err(to_s3_error)?;

        Ok(S3Response::new(AbortMultipartUploadOutput::default()))
    }

    async fn list_multipart_uploads(
        &self,
        req: S3Request<ListMultipartUploadsInput>,
    ) -> s3s::S3Result<S3Response<ListMultipartUploadsOutput>> {
        let bucket = req.input.bucket.as_str();
        let prefix = req.input.prefix.as_deref().unwrap_or("");
        let max_uploads = req
            .input
            .max_uploads
            .unwrap_or(MAX_LIST_MULTIPART_UPLOADS)
            .min(MAX_LIST_MULTIPART_UPLOADS);
        debug!(bucket, prefix, "S3 ListMultipartUploads");

        let uploads = self
            .engine
            .list_multipart_uploads(bucket)
            .await
            .map_err(to_s3_error)?;

        let uploads: Vec<MultipartUpload> = uploads
            .iter()
            .filter_map(|u| u.info.as_ref().map(|info| (u, info)))
            .filter(|(_, info)| info.name.starts_with(prefix))
            .take(max_uploads as usize)
            .map(|(u, info)| MultipartUpload {
                upload_id: Some(u.id.clone()),
                key: Some(info.name.clone()),
                initiated: Some(timestamp_from_ms(info.mod_time_ms)),
                owner: Some(owner_dto()),
                initiator: Some(Initiator {
                    display_name: Some("madrone".to_string()),
                    id: Some("madrone".to_string()),
                }),
                ..Default::default()
            })
            .collect();

        Ok(S3Response::new(ListMultipartUploadsOutput {
            bucket: Some(bucket.to_string()),
            prefix: req.input.prefix.clone(),
            key_marker: req.input.key_marker.clone(),
            upload_id_marker: req.input.upload_id_marker.clone(),
            max_uploads: Some(max_uploads),
            is_truncated: Some(false),
            uploads: (!uploads.is_empty()).then_some(uploads),
            delimiter: req.input.delimiter.clone(),
            ..Default::default()
        }))
    }

    async fn list_parts(
        &self,
        req: S3Request<ListPartsInput>,
    ) -> s3s::S3Result<S3Response<ListPartsOutput>> {
        let bucket = req.input.bucket.as_str();
        let key = req.input.key.as_str();
        let upload_id = req.input.upload_id.as_str();
        debug!(bucket, key, upload_id, "S3 ListParts");

        let upload = self
            .engine
            .list_object_parts(upload_id)
            .await
            .map_err(to_s3_error)?;

        if upload.info.as_ref().map(|i| i.name.as_str()) != Some(key) {
            return Err(s3_error!(
                InvalidArgument,
                "Key mismatch for upload ID '{}'",
                upload_id
            ));
        }

        let parts: Vec<Part> = upload
            .parts
            .values()
            .map(|p| Part {
                part_number: Some(p.part_number),
                size: Some(p.size),
                e_tag: Some(quote_etag(&p.etag)),
                ..Default::default()
            })
            .collect();

        Ok(S3Response::new(ListPartsOutput {
            bucket: Some(bucket.to_string()),
            key: Some(key.to_string()),
            upload_id: Some(upload_id.to_string()),
            parts: Some(parts),
            is_truncated: Some(false),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_int_resolves_inclusive_bounds() {
        let r = resolve_range(
            &Range::Int {
                first: 2,
                last: Some(4),
            },
            10,
        )
        .unwrap();
        assert_eq!((r.start, r.end), (2, 4));
    }

    #[test]
    fn range_open_end_runs_to_last_byte() {
        let r = resolve_range(&Range::Int { first: 3, last: None }, 10).unwrap();
        assert_eq!((r.start, r.end), (3, 9));
    }

    #[test]
    fn range_suffix_takes_trailing_bytes() {
        let r = resolve_range(&Range::Suffix { length: 4 }, 10).unwrap();
        assert_eq!((r.start, r.end), (6, 9));
    }

    #[test]
    fn range_past_end_is_rejected() {
        assert!(resolve_range(
            &Range::Int {
                first: 10,
                last: None
            },
            10
        )
        .is_err());
    }

    #[test]
    fn bucket_name_rules() {
        assert!(MadroneS3Service::validate_bucket_name("my-bucket.1").is_ok());
        assert!(MadroneS3Service::validate_bucket_name("ab").is_err());
        assert!(MadroneS3Service::validate_bucket_name("Upper").is_err());
        assert!(MadroneS3Service::validate_bucket_name("-leading").is_err());
    }

    #[test]
    fn content_range_header_shape() {
        assert_eq!(format_content_range(0, 4, 10), "bytes 0-4/10");
    }
}
