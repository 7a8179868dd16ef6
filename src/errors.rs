use std::io;
use thiserror::Error;

use crate::models::layout::UnknownCompression;

/// Failure to build an authenticated client for the object store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("region `{0}` is not a valid region name")]
    InvalidRegion(String),
    #[error("endpoint `{endpoint}` invalid: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Failure reported by the remote put call.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The service answered and refused the request (access denied, missing bucket, ...).
    #[error("upload of `{key}` to bucket `{bucket}` rejected ({}): {message}", .code.as_deref().unwrap_or("unknown"))]
    Rejected {
        bucket: String,
        key: String,
        code: Option<String>,
        message: String,
    },
    /// The request never produced a service response (network, credentials, timeout).
    #[error("upload of `{key}` to bucket `{bucket}` failed: {message}")]
    Transport {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("upload of `{key}` to bucket `{bucket}` cancelled")]
    Cancelled { bucket: String, key: String },
}

impl UploadError {
    /// Service error code, when the service produced one.
    pub fn code(&self) -> Option<&str> {
        match self {
            UploadError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Terminal error of a single `write` call.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("compressing payload: {0}")]
    Compression(#[source] io::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

pub type WriteResult<T> = Result<T, WriteError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("s3_bucket is required")]
    MissingBucket,
    #[error(transparent)]
    Compression(#[from] UnknownCompression),
}
