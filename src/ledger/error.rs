//! Ledger engine error taxonomy.

use snafu::Snafu;

use crate::dag::DagError;
use crate::index::IndexError;

/// Errors surfaced by the ledger engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerError {
    /// CreateBucket on a name that is already taken.
    #[snafu(display("bucket '{bucket}' already exists"))]
    BucketExists {
        /// The conflicting bucket name.
        bucket: String,
    },

    /// Operation on a bucket the index does not know.
    #[snafu(display("bucket '{bucket}' not found"))]
    BucketNotFound {
        /// The missing bucket name.
        bucket: String,
    },

    /// DeleteBucket on a bucket that still holds objects.
    #[snafu(display("bucket '{bucket}' is not empty"))]
    BucketNotEmpty {
        /// The non-empty bucket name.
        bucket: String,
    },

    /// Operation on an object the bucket record does not list.
    #[snafu(display("object '{object}' not found in bucket '{bucket}'"))]
    ObjectNotFound {
        /// Bucket searched.
        bucket: String,
        /// Missing object name.
        object: String,
    },

    /// Multipart operation on an unknown or terminated upload id.
    #[snafu(display("invalid upload id '{id}'"))]
    InvalidUploadId {
        /// The rejected id.
        id: String,
    },

    /// A completion request referenced a part that was never uploaded or
    /// whose etag does not match.
    #[snafu(display("invalid part {part_number} in upload '{id}': {reason}"))]
    InvalidPart {
        /// Upload being completed.
        id: String,
        /// The offending part number.
        part_number: i32,
        /// Why it was rejected.
        reason: String,
    },

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

    /// Unclassified engine bug.
    #[snafu(display("internal ledger error: {message}"))]
    Internal {
        /// Failure detail.
        message: String,
    },
}

impl From<DagError> for LedgerError {
    fn from(source: DagError) -> Self {
        LedgerError::Dag { source }
    }
}

impl From<IndexError> for LedgerError {
    fn from(source: IndexError) -> Self {
        LedgerError::Index { source }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
