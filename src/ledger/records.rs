//! Serialized ledger records.
//!
//! These are the blocks the gateway writes into the DAG store. They are
//! hand-written protobuf messages: field tags are frozen, maps are sorted,
//! and prost encodes fields in tag order, so a given record always
//! serializes to the same bytes and therefore the same CID. Do not renumber
//! or reuse tags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Bucket record: one immutable generation of a bucket's namespace.
///
/// `objects` maps object names to the CIDs of their [`Object`] records.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Bucket {
    /// Bucket name, globally unique in this gateway.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Creation time, Unix milliseconds UTC. Zero in test mode.
    #[prost(int64, tag = "2")]
    pub created_ms: i64,
    /// Region tag; opaque to the engine.
    #[prost(string, tag = "3")]
    pub location: String,
    /// Object name to object-record CID.
    #[prost(btree_map = "string, string", tag = "4")]
    pub objects: BTreeMap<String, String>,
}

/// Metadata describing one object version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectInfo {
    /// Object name within its bucket.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Owning bucket name.
    #[prost(string, tag = "2")]
    pub bucket: String,
    /// Object size in bytes.
    #[prost(int64, tag = "3")]
    pub size: i64,
    /// Last-modified time, Unix milliseconds UTC. Zero in test mode.
    #[prost(int64, tag = "4")]
    pub mod_time_ms: i64,
    /// Hex content hash of the object data.
    #[prost(string, tag = "5")]
    pub etag: String,
    /// MIME content type; empty when the client supplied none.
    #[prost(string, tag = "6")]
    pub content_type: String,
    /// Content-Encoding header value, if any.
    #[prost(string, tag = "7")]
    pub content_encoding: String,
    /// Content-Language header value, if any.
    #[prost(string, tag = "8")]
    pub content_language: String,
    /// Content-Disposition header value, if any.
    #[prost(string, tag = "9")]
    pub content_disposition: String,
    /// User metadata (`x-amz-meta-*` pairs, without the prefix).
    #[prost(btree_map = "string, string", tag = "10")]
    pub user_metadata: BTreeMap<String, String>,
}

/// Object record: metadata plus a pointer to the raw data block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Object {
    /// Object metadata.
    #[prost(message, optional, tag = "1")]
    pub info: Option<ObjectInfo>,
    /// CID of the raw data block.
    #[prost(string, tag = "2")]
    pub data_cid: String,
}

/// One uploaded part of a multipart upload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectPart {
    /// Client-chosen part number.
    #[prost(int32, tag = "1")]
    pub part_number: i32,
    /// CID of the part's data block.
    #[prost(string, tag = "2")]
    pub data_cid: String,
    /// Part size in bytes.
    #[prost(int64, tag = "3")]
    pub size: i64,
    /// Hex content hash of the part data.
    #[prost(string, tag = "4")]
    pub etag: String,
}

/// An in-flight multipart upload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultipartUpload {
    /// Upload id, unique and time-ordered.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Metadata of the object the upload will materialize.
    #[prost(message, optional, tag = "2")]
    pub info: Option<ObjectInfo>,
    /// Part number to part.
    #[prost(btree_map = "int32, message", tag = "3")]
    pub parts: BTreeMap<i32, ObjectPart>,
}

/// Ledger state record: the multipart upload registry.
///
/// Persisted under the `ledger-state` index key so in-flight uploads
/// survive a restart.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LedgerState {
    /// Upload id to upload.
    #[prost(btree_map = "string, message", tag = "1")]
    pub uploads: BTreeMap<String, MultipartUpload>,
}

/// Convert a record timestamp to a chrono UTC datetime.
///
/// Zero (test mode) maps to the Unix epoch.
pub fn datetime_from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}
