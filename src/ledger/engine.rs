//! The ledger engine.
//!
//! Composes the DAG client, the index store, the per-bucket lock table and
//! the bucket cache into the synchronous API the S3 frontend consumes.
//!
//! Mutation order is strict everywhere: data block first, then object
//! record, then bucket record, then the index pointer. The index `put` is
//! the linearization point; it always happens while the bucket's write
//! lock is held, so a reader blocked on the lock sees either the prior
//! state or the fully committed new one, never a partial write. A crash
//! between block writes and the index update leaves orphan blocks in the
//! DAG store, which are never reclaimed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use prost::Message;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::cid::Cid;
use crate::dag::{BlockStore, DagClient, DagError};
use crate::index::{bucket_key, IndexStore, BUCKET_KEY_PREFIX, LEDGER_STATE_KEY};

use super::cache::BucketCache;
use super::error::{LedgerError, LedgerResult};
use super::locks::BucketLocks;
use super::records::{Bucket, LedgerState, MultipartUpload, Object, ObjectInfo, ObjectPart};

/// Backoff before the single retry of an idempotent read.
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Projection of a bucket record for listings.
#[derive(Debug, Clone)]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Creation time, Unix milliseconds UTC.
    pub created_ms: i64,
    /// Region tag.
    pub location: String,
}

/// Caller-supplied options for object creation.
#[derive(Debug, Clone, Default)]
pub struct PutObjectOptions {
    /// MIME content type.
    pub content_type: Option<String>,
    /// Content-Encoding header value.
    pub content_encoding: Option<String>,
    /// Content-Language header value.
    pub content_language: Option<String>,
    /// Content-Disposition header value.
    pub content_disposition: Option<String>,
    /// User metadata pairs.
    pub user_metadata: BTreeMap<String, String>,
}

/// The ledger engine.
///
/// One instance is shared by all request handlers. Constructed with a
/// block store, an index store and a test flag; when `is_test` is set,
/// record timestamps stay zero so record CIDs are a pure function of the
/// operation sequence.
pub struct LedgerEngine {
    dag: DagClient,
    index: Arc<dyn IndexStore>,
    locks: BucketLocks,
    cache: BucketCache,
    /// In-memory copy of the multipart registry, guarded separately from
    /// the per-bucket locks.
    state: Mutex<LedgerState>,
    is_test: bool,
}

impl LedgerEngine {
    /// Construct the engine, reloading persisted ledger state if present.
    pub async fn new(
        store: Arc<dyn BlockStore>,
        index: Arc<dyn IndexStore>,
        is_test: bool,
    ) -> LedgerResult<Self> {
        let dag = DagClient::new(store);
        let state = match index.get(LEDGER_STATE_KEY).await? {
            Some(cid) => dag.load_record(&Cid::from(cid)).await?,
            None => LedgerState::default(),
        };
        Ok(Self {
            dag,
            index,
            locks: BucketLocks::new(),
            cache: BucketCache::new(),
            state: Mutex::new(state),
            is_test,
        })
    }

    fn now_ms(&self) -> i64 {
        if self.is_test {
            0
        } else {
            Utc::now().timestamp_millis()
        }
    }

    // ===== Record loading helpers =====

    /// Load a record, retrying once on a transport failure. Reads are
    /// idempotent; writes are never retried here.
    async fn load_record_retry<M: Message + Default>(&self, cid: &Cid) -> Result<M, DagError> {
        match self.dag.load_record(cid).await {
            Err(DagError::Unavailable { .. }) => {
                tokio::time::sleep(READ_RETRY_BACKOFF).await;
                self.dag.load_record(cid).await
            }
            other => other,
        }
    }

    /// Load a raw block, retrying once on a transport failure.
    async fn load_bytes_retry(&self, cid: &Cid) -> Result<Bytes, DagError> {
        match self.dag.load_bytes(cid).await {
            Err(DagError::Unavailable { .. }) => {
                tokio::time::sleep(READ_RETRY_BACKOFF).await;
                self.dag.load_bytes(cid).await
            }
            other => other,
        }
    }

    /// Load a record tied to a bucket, evicting the bucket's cache entry
    /// when the block fails its integrity check so a poisoned record can
    /// never linger.
    async fn load_record_guarded<M: Message + Default>(
        &self,
        bucket: &str,
        cid: &Cid,
    ) -> LedgerResult<M> {
        match self.load_record_retry(cid).await {
            Err(e @ (DagError::CidMismatch { .. } | DagError::Corrupt { .. })) => {
                error!(bucket, cid = %cid, error = %e, "record integrity failure");
                self.cache.evict(bucket);
                Err(e.into())
            }
            other => other.map_err(Into::into),
        }
    }

    /// Load a data block tied to a bucket, with the same eviction rule.
    async fn load_bytes_guarded(&self, bucket: &str, cid: &Cid) -> LedgerResult<Bytes> {
        match self.load_bytes_retry(cid).await {
            Err(e @ DagError::CidMismatch { .. }) => {
                error!(bucket, cid = %cid, error = %e, "data block integrity failure");
                self.cache.evict(bucket);
                Err(e.into())
            }
            other => other.map_err(Into::into),
        }
    }

    /// Load a bucket record; the caller must hold the bucket's lock.
    async fn load_bucket_locked(&self, name: &str) -> LedgerResult<Bucket> {
        if let Some(record) = self.cache.get(name) {
            return Ok(record);
        }
        let cid = self
            .index
            .get(&bucket_key(name))
            .await?
            .ok_or_else(|| LedgerError::BucketNotFound {
                bucket: name.to_string(),
            })?;
        let record: Bucket = self.load_record_guarded(name, &Cid::from(cid)).await?;
        self.cache.insert(name, record.clone());
        Ok(record)
    }

    /// Save a bucket record and repoint the index. The index write is the
    /// linearization point; the cache entry is replaced only after it.
    async fn commit_bucket(&self, name: &str, record: Bucket) -> LedgerResult<Cid> {
        let cid = self.dag.save_record(&record).await?;
        self.index.put(&bucket_key(name), cid.as_str()).await?;
        self.cache.insert(name, record);
        debug!(bucket = name, cid = %cid, "bucket record committed");
        Ok(cid)
    }

    /// Resolve an object's record within an already loaded bucket record.
    async fn load_object_record(
        &self,
        bucket: &str,
        record: &Bucket,
        object: &str,
    ) -> LedgerResult<Object> {
        let cid = record
            .objects
            .get(object)
            .ok_or_else(|| LedgerError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            })?;
        self.load_record_guarded(bucket, &Cid::from(cid.clone()))
            .await
    }

    fn take_info(record: Object) -> LedgerResult<ObjectInfo> {
        record.info.ok_or_else(|| LedgerError::Internal {
            message: "object record missing info".to_string(),
        })
    }

    /// Write an object's data block and record; returns the info and the
    /// record CID. Does not touch the bucket record.
    async fn store_object(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        opts: PutObjectOptions,
    ) -> LedgerResult<(ObjectInfo, Cid)> {
        let size = data.len() as i64;
        let data_cid = self.dag.save_bytes(data).await?;
        let info = ObjectInfo {
            name: object.to_string(),
            bucket: bucket.to_string(),
            size,
            mod_time_ms: self.now_ms(),
            etag: data_cid.as_str().to_string(),
            content_type: opts.content_type.unwrap_or_default(),
            content_encoding: opts.content_encoding.unwrap_or_default(),
            content_language: opts.content_language.unwrap_or_default(),
            content_disposition: opts.content_disposition.unwrap_or_default(),
            user_metadata: opts.user_metadata,
        };
        let record = Object {
            info: Some(info.clone()),
            data_cid: data_cid.into_string(),
        };
        let cid = self.dag.save_record(&record).await?;
        Ok((info, cid))
    }

    // ===== Bucket operations =====

    /// Create a bucket. Fails with `BucketExists` when the name is taken.
    pub async fn create_bucket(&self, name: &str, location: &str) -> LedgerResult<()> {
        let _guard = self.locks.write(name).await;
        if self.index.has(&bucket_key(name)).await? {
            return Err(LedgerError::BucketExists {
                bucket: name.to_string(),
            });
        }
        let record = Bucket {
            name: name.to_string(),
            created_ms: self.now_ms(),
            location: location.to_string(),
            objects: BTreeMap::new(),
        };
        self.commit_bucket(name, record).await?;
        info!(bucket = name, location, "bucket created");
        Ok(())
    }

    /// Delete a bucket. Fails with `BucketNotEmpty` while it holds objects.
    pub async fn delete_bucket(&self, name: &str) -> LedgerResult<()> {
        let _guard = self.locks.write(name).await;
        let record = self.load_bucket_locked(name).await?;
        if !record.objects.is_empty() {
            return Err(LedgerError::BucketNotEmpty {
                bucket: name.to_string(),
            });
        }
        self.index.delete(&bucket_key(name)).await?;
        self.cache.evict(name);
        info!(bucket = name, "bucket deleted");
        Ok(())
    }

    /// Check whether a bucket exists.
    pub async fn bucket_exists(&self, name: &str) -> LedgerResult<bool> {
        Ok(self.index.has(&bucket_key(name)).await?)
    }

    /// Project a bucket's info.
    pub async fn get_bucket_info(&self, name: &str) -> LedgerResult<BucketInfo> {
        let _guard = self.locks.read(name).await;
        let record = self.load_bucket_locked(name).await?;
        Ok(BucketInfo {
            name: record.name,
            created_ms: record.created_ms,
            location: record.location,
        })
    }

    /// Enumerate all buckets in lexicographic name order.
    pub async fn list_buckets(&self) -> LedgerResult<Vec<BucketInfo>> {
        let rows = self.index.scan_prefix(BUCKET_KEY_PREFIX).await?;
        let mut infos = Vec::with_capacity(rows.len());
        for (key, _cid) in rows {
            let Some(name) = key.strip_prefix(BUCKET_KEY_PREFIX) else {
                continue;
            };
            let _guard = self.locks.read(name).await;
            match self.load_bucket_locked(name).await {
                Ok(record) => infos.push(BucketInfo {
                    name: record.name,
                    created_ms: record.created_ms,
                    location: record.location,
                }),
                // Deleted between the scan and the load.
                Err(LedgerError::BucketNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(infos)
    }

    // ===== Object operations =====

    /// Create or replace an object.
    pub async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        opts: PutObjectOptions,
    ) -> LedgerResult<ObjectInfo> {
        let _guard = self.locks.write(bucket).await;
        let mut record = self.load_bucket_locked(bucket).await?;
        let (info, object_cid) = self.store_object(bucket, object, data, opts).await?;
        record
            .objects
            .insert(object.to_string(), object_cid.into_string());
        self.commit_bucket(bucket, record).await?;
        info!(bucket, object, size = info.size, "object stored");
        Ok(info)
    }

    /// Fetch an object's metadata and bytes.
    pub async fn get_object(&self, bucket: &str, object: &str) -> LedgerResult<(ObjectInfo, Bytes)> {
        let _guard = self.locks.read(bucket).await;
        let record = self.load_bucket_locked(bucket).await?;
        let object_record = self.load_object_record(bucket, &record, object).await?;
        let data_cid = Cid::from(object_record.data_cid.clone());
        let info = Self::take_info(object_record)?;
        let data = self.load_bytes_guarded(bucket, &data_cid).await?;
        Ok((info, data))
    }

    /// Fetch an object's metadata without its bytes.
    pub async fn get_object_info(&self, bucket: &str, object: &str) -> LedgerResult<ObjectInfo> {
        let _guard = self.locks.read(bucket).await;
        let record = self.load_bucket_locked(bucket).await?;
        let object_record = self.load_object_record(bucket, &record, object).await?;
        Self::take_info(object_record)
    }

    /// List objects: names starting with `prefix`, strictly greater than
    /// `start_after` when it is non-empty, in ascending order, at most
    /// `max` entries when `max > 0`. A snapshot of the bucket record at
    /// the moment the read lock was acquired.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: &str,
        max: usize,
    ) -> LedgerResult<Vec<ObjectInfo>> {
        let _guard = self.locks.read(bucket).await;
        let record = self.load_bucket_locked(bucket).await?;

        // BTreeMap keys iterate in ascending order already.
        let mut names: Vec<String> = record
            .objects
            .keys()
            .filter(|name| {
                name.starts_with(prefix) && (start_after.is_empty() || name.as_str() > start_after)
            })
            .cloned()
            .collect();
        if max > 0 && names.len() > max {
            names.truncate(max);
        }

        let mut infos = Vec::with_capacity(names.len());
        for name in &names {
            let object_record = self.load_object_record(bucket, &record, name).await?;
            infos.push(Self::take_info(object_record)?);
        }
        Ok(infos)
    }

    /// Copy an object, reusing its data block.
    pub async fn copy_object(
        &self,
        src_bucket: &str,
        src_object: &str,
        dst_bucket: &str,
        dst_object: &str,
    ) -> LedgerResult<ObjectInfo> {
        let _locks = self.locks.lock_copy_pair(src_bucket, dst_bucket).await;

        let mut dst_record = self.load_bucket_locked(dst_bucket).await?;
        let src_record = if src_bucket == dst_bucket {
            dst_record.clone()
        } else {
            self.load_bucket_locked(src_bucket).await?
        };

        let source = self
            .load_object_record(src_bucket, &src_record, src_object)
            .await?;
        let mut info = source.info.clone().ok_or_else(|| LedgerError::Internal {
            message: "object record missing info".to_string(),
        })?;
        info.bucket = dst_bucket.to_string();
        info.name = dst_object.to_string();
        info.mod_time_ms = self.now_ms();

        let record = Object {
            info: Some(info.clone()),
            data_cid: source.data_cid.clone(),
        };
        let cid = self.dag.save_record(&record).await?;
        dst_record
            .objects
            .insert(dst_object.to_string(), cid.into_string());
        self.commit_bucket(dst_bucket, dst_record).await?;
        info!(
            src_bucket,
            src_object, dst_bucket, dst_object, "object copied"
        );
        Ok(info)
    }

    /// Delete an object. Fails with `ObjectNotFound` when absent.
    pub async fn delete_object(&self, bucket: &str, object: &str) -> LedgerResult<()> {
        let _guard = self.locks.write(bucket).await;
        let mut record = self.load_bucket_locked(bucket).await?;
        if record.objects.remove(object).is_none() {
            return Err(LedgerError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            });
        }
        self.commit_bucket(bucket, record).await?;
        info!(bucket, object, "object deleted");
        Ok(())
    }

    /// Delete a batch of objects under one lock and one commit; returns
    /// the names that were not present instead of aborting on them.
    pub async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[String],
    ) -> LedgerResult<Vec<String>> {
        let _guard = self.locks.write(bucket).await;
        let mut record = self.load_bucket_locked(bucket).await?;
        let mut missing = Vec::new();
        for name in objects {
            if record.objects.remove(name).is_none() {
                missing.push(name.clone());
            }
        }
        self.commit_bucket(bucket, record).await?;
        debug!(
            bucket,
            requested = objects.len(),
            missing = missing.len(),
            "batch delete committed"
        );
        Ok(missing)
    }

    // ===== Multipart operations =====

    /// Persist the ledger state record and repoint the index key.
    async fn persist_state(&self, state: &LedgerState) -> LedgerResult<()> {
        let cid = self.dag.save_record(state).await?;
        self.index.put(LEDGER_STATE_KEY, cid.as_str()).await?;
        Ok(())
    }

    /// Start a multipart upload, returning its id.
    pub async fn new_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        opts: PutObjectOptions,
    ) -> LedgerResult<String> {
        let _guard = self.locks.write(bucket).await;
        self.load_bucket_locked(bucket).await?;

        // v7 ids are unique and time-ordered.
        let id = Uuid::now_v7().to_string();
        let info = ObjectInfo {
            name: object.to_string(),
            bucket: bucket.to_string(),
            size: 0,
            mod_time_ms: self.now_ms(),
            etag: String::new(),
            content_type: opts.content_type.unwrap_or_default(),
            content_encoding: opts.content_encoding.unwrap_or_default(),
            content_language: opts.content_language.unwrap_or_default(),
            content_disposition: opts.content_disposition.unwrap_or_default(),
            user_metadata: opts.user_metadata,
        };

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.uploads.insert(
            id.clone(),
            MultipartUpload {
                id: id.clone(),
                info: Some(info),
                parts: BTreeMap::new(),
            },
        );
        self.persist_state(&next).await?;
        *state = next;
        info!(bucket, object, upload_id = %id, "multipart upload initiated");
        Ok(id)
    }

    /// Record one part of a multipart upload, returning the part entry.
    pub async fn put_object_part(
        &self,
        id: &str,
        part_number: i32,
        data: Bytes,
    ) -> LedgerResult<ObjectPart> {
        // Reject unknown ids before paying for the block write.
        {
            let state = self.state.lock().await;
            if !state.uploads.contains_key(id) {
                return Err(LedgerError::InvalidUploadId { id: id.to_string() });
            }
        }

        let size = data.len() as i64;
        let data_cid = self.dag.save_bytes(data).await?;
        let part = ObjectPart {
            part_number,
            data_cid: data_cid.as_str().to_string(),
            size,
            etag: data_cid.into_string(),
        };

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let upload = next
            .uploads
            .get_mut(id)
            // The upload may have been aborted while the block was in flight.
            .ok_or_else(|| LedgerError::InvalidUploadId { id: id.to_string() })?;
        upload.parts.insert(part_number, part.clone());
        self.persist_state(&next).await?;
        *state = next;
        debug!(upload_id = id, part_number, size, "part recorded");
        Ok(part)
    }

    /// Complete a multipart upload: validate the requested parts,
    /// concatenate their bytes in ascending part-number order, store the
    /// result as a single object, and retire the upload id.
    pub async fn complete_multipart_upload(
        &self,
        id: &str,
        parts: &[(i32, String)],
    ) -> LedgerResult<ObjectInfo> {
        let bucket = {
            let state = self.state.lock().await;
            state
                .uploads
                .get(id)
                .and_then(|u| u.info.as_ref())
                .map(|i| i.bucket.clone())
                .ok_or_else(|| LedgerError::InvalidUploadId { id: id.to_string() })?
        };

        let _guard = self.locks.write(&bucket).await;
        let mut state = self.state.lock().await;
        // Re-check under the state lock: an abort may have won the race.
        let upload = state
            .uploads
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::InvalidUploadId { id: id.to_string() })?;
        let upload_info = upload.info.clone().ok_or_else(|| LedgerError::Internal {
            message: "multipart upload missing object info".to_string(),
        })?;

        let mut numbers = Vec::with_capacity(parts.len());
        for (part_number, etag) in parts {
            let stored =
                upload
                    .parts
                    .get(part_number)
                    .ok_or_else(|| LedgerError::InvalidPart {
                        id: id.to_string(),
                        part_number: *part_number,
                        reason: "part was never uploaded".to_string(),
                    })?;
            let requested = etag.trim_matches('"');
            if !requested.is_empty() && requested != stored.etag {
                return Err(LedgerError::InvalidPart {
                    id: id.to_string(),
                    part_number: *part_number,
                    reason: format!("etag mismatch: expected {}, got {}", stored.etag, requested),
                });
            }
            numbers.push(*part_number);
        }
        numbers.sort_unstable();
        numbers.dedup();

        let total: i64 = numbers
            .iter()
            .filter_map(|n| upload.parts.get(n))
            .map(|p| p.size)
            .sum();
        let mut data = Vec::with_capacity(total as usize);
        for number in &numbers {
            let part = upload
                .parts
                .get(number)
                .ok_or_else(|| LedgerError::Internal {
                    message: format!("validated part {} vanished from upload", number),
                })?;
            let bytes = self
                .load_bytes_guarded(&bucket, &Cid::from(part.data_cid.clone()))
                .await?;
            data.extend_from_slice(&bytes);
        }

        let mut record = self.load_bucket_locked(&bucket).await?;
        let opts = PutObjectOptions {
            content_type: non_empty(upload_info.content_type),
            content_encoding: non_empty(upload_info.content_encoding),
            content_language: non_empty(upload_info.content_language),
            content_disposition: non_empty(upload_info.content_disposition),
            user_metadata: upload_info.user_metadata,
        };
        let (info, object_cid) = self
            .store_object(&bucket, &upload_info.name, Bytes::from(data), opts)
            .await?;
        record
            .objects
            .insert(upload_info.name.clone(), object_cid.into_string());
        self.commit_bucket(&bucket, record).await?;

        let mut next = state.clone();
        next.uploads.remove(id);
        self.persist_state(&next).await?;
        *state = next;

        info!(
            bucket = %bucket,
            object = %upload_info.name,
            upload_id = id,
            parts = numbers.len(),
            size = info.size,
            "multipart upload completed"
        );
        Ok(info)
    }

    /// Abort a multipart upload. Part blocks are left in the DAG store.
    pub async fn abort_multipart_upload(&self, id: &str) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        if !state.uploads.contains_key(id) {
            return Err(LedgerError::InvalidUploadId { id: id.to_string() });
        }
        let mut next = state.clone();
        next.uploads.remove(id);
        self.persist_state(&next).await?;
        *state = next;
        info!(upload_id = id, "multipart upload aborted");
        Ok(())
    }

    /// All in-flight uploads targeting a bucket, in id order.
    pub async fn list_multipart_uploads(&self, bucket: &str) -> LedgerResult<Vec<MultipartUpload>> {
        if !self.bucket_exists(bucket).await? {
            return Err(LedgerError::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }
        let state = self.state.lock().await;
        Ok(state
            .uploads
            .values()
            .filter(|u| u.info.as_ref().is_some_and(|i| i.bucket == bucket))
            .cloned()
            .collect())
    }

    /// The upload with the given id, parts in ascending part-number order.
    pub async fn list_object_parts(&self, id: &str) -> LedgerResult<MultipartUpload> {
        let state = self.state.lock().await;
        state
            .uploads
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::InvalidUploadId { id: id.to_string() })
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
