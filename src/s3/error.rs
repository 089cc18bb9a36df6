//! Mapping from the ledger error taxonomy to S3 error codes.

use s3s::s3_error;
use tracing::error;

use crate::dag::DagError;
use crate::ledger::LedgerError;

/// Convert a ledger error into the S3 error the client should see.
///
/// User-caused conditions map to their S3 codes unchanged; store-side
/// failures collapse to `InternalError`. Integrity failures are logged at
/// error severity before they leave the gateway.
pub fn to_s3_error(err: LedgerError) -> s3s::S3Error {
    match err {
        LedgerError::BucketExists { bucket } => {
            s3_error!(BucketAlreadyOwnedByYou, "Bucket '{}' already exists", bucket)
        }
        LedgerError::BucketNotFound { bucket } => {
            s3_error!(NoSuchBucket, "Bucket '{}' does not exist", bucket)
        }
        LedgerError::BucketNotEmpty { bucket } => {
            s3_error!(BucketNotEmpty, "Bucket '{}' is not empty", bucket)
        }
        LedgerError::ObjectNotFound { bucket, object } => {
            s3_error!(NoSuchKey, "Object '{}' not found in bucket '{}'", object, bucket)
        }
        LedgerError::InvalidUploadId { id } => {
            s3_error!(NoSuchUpload, "Upload ID '{}' not found", id)
        }
        LedgerError::InvalidPart {
            part_number,
            reason,
            ..
        } => s3_error!(InvalidPart, "Part {}: {}", part_number, reason),
        LedgerError::Dag { source } => match source {
            DagError::Unavailable { message } => s3_error!(
                InternalError,
                "DAG node unavailable, retry shortly: {}",
                message
            ),
            e @ (DagError::CidMismatch { .. } | DagError::Corrupt { .. }) => {
                error!(error = %e, "critical: stored record failed integrity check");
                s3_error!(InternalError, "stored record failed integrity check")
            }
            DagError::Cancelled { operation } => {
                s3_error!(InternalError, "operation cancelled during {}", operation)
            }
            DagError::NotFound { cid } => {
                error!(cid = %cid, "critical: index points at a missing block");
                s3_error!(InternalError, "referenced block missing from DAG store")
            }
        },
        LedgerError::Index { source } => {
            s3_error!(InternalError, "index store failure: {}", source)
        }
        LedgerError::Internal { message } => s3_error!(InternalError, "{}", message),
    }
}
