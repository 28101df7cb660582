use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Remote service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether retrying the same call could succeed.
    ///
    /// Timeouts, throttling (429) and server errors (5xx) are transient;
    /// everything else is treated as permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Timeout(_) => true,
            BridgeError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
