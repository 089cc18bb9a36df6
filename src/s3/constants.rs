//! S3 API constants and limits.
//!
//! All limits are fixed so no request can allocate unboundedly.

/// Maximum object size in bytes (100 MB). Objects move through the engine
/// whole, so this also bounds a single request body.
pub const MAX_OBJECT_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Maximum part size for multipart uploads (100 MB).
pub const MAX_PART_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Highest part number a multipart upload may use (S3 limit).
pub const MAX_MULTIPART_PARTS: u32 = 10_000;

/// Maximum S3 bucket name length in bytes (S3 rule).
pub const MAX_BUCKET_NAME_LENGTH: usize = 63;

/// Minimum S3 bucket name length in bytes (S3 rule).
pub const MIN_BUCKET_NAME_LENGTH: usize = 3;

/// Maximum object key length in bytes (S3 rule).
pub const MAX_KEY_LENGTH: usize = 1024;

/// Maximum keys per listing response (S3 default page size).
pub const MAX_LIST_OBJECTS: i32 = 1000;

/// Maximum uploads per ListMultipartUploads response.
pub const MAX_LIST_MULTIPART_UPLOADS: i32 = 1000;

/// Content type assigned when the client supplies none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Region reported for buckets created without an explicit location.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default S3 listen port.
pub const DEFAULT_S3_PORT: u16 = 9000;
