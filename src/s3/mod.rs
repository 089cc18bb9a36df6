//! S3-compatible API surface.
//!
//! Thin translation from the S3 verb set onto the ledger engine. The
//! frontend owns no durable state: it validates names, reads request
//! bodies, calls the engine, and maps the engine's error taxonomy onto
//! S3 error codes.

pub mod constants;
pub mod error;
pub mod service;

pub use constants::*;
pub use error::to_s3_error;
pub use service::MadroneS3Service;
