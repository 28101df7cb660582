//! Error types for the S3 provider

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum S3Error {
    /// The client could not be configured (no region, bad endpoint)
    #[error("S3 configuration invalid: {0}")]
    Configuration(String),

    #[error("S3 {operation} on bucket {bucket} timed out")]
    Timeout {
        operation: &'static str,
        bucket: String,
    },

    /// The service answered with an error status
    #[error("S3 {operation} on bucket {bucket} returned status {status}: {message}")]
    Service {
        operation: &'static str,
        bucket: String,
        status: u16,
        message: String,
    },

    /// The request never got a response
    #[error("S3 {operation} on bucket {bucket} failed: {message}")]
    Transport {
        operation: &'static str,
        bucket: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, S3Error>;

impl S3Error {
    /// Classify an SDK error for the given operation.
    pub fn from_sdk<E>(operation: &'static str, bucket: &str, err: &SdkError<E>) -> Self
    where
        E: std::error::Error + 'static,
    {
        let bucket = bucket.to_string();
        match err {
            SdkError::TimeoutError(_) => S3Error::Timeout { operation, bucket },
            SdkError::ServiceError(se) => S3Error::Service {
                operation,
                bucket,
                status: se.raw().status().as_u16(),
                message: DisplayErrorContext(se.err()).to_string(),
            },
            other => S3Error::Transport {
                operation,
                bucket,
                message: DisplayErrorContext(other).to_string(),
            },
        }
    }
}

/// Whether an SDK error is a plain 404 (missing key on `HeadObject`).
pub fn is_not_found<E>(err: &SdkError<E>) -> bool
where
    E: std::error::Error + 'static,
{
    matches!(err, SdkError::ServiceError(se) if se.raw().status().as_u16() == 404)
}

impl From<S3Error> for BridgeError {
    fn from(error: S3Error) -> Self {
        match error {
            S3Error::Configuration(msg) => BridgeError::NotAvailable(msg),
            S3Error::Timeout { operation, bucket } => {
                BridgeError::Timeout(format!("S3 {} on bucket {}", operation, bucket))
            }
            S3Error::Service {
                operation,
                bucket,
                status,
                message,
            } => BridgeError::Status {
                status,
                message: format!("S3 {} on bucket {}: {}", operation, bucket, message),
            },
            e @ S3Error::Transport { .. } => BridgeError::OperationFailed(e.to_string()),
        }
    }
}
