//! Error types for the Slack provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlackError {
    /// Slack answered with a non-2xx status
    #[error("Slack webhook returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to build webhook payload: {0}")]
    Payload(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SlackError>;

impl From<SlackError> for BridgeError {
    fn from(error: SlackError) -> Self {
        match error {
            SlackError::Rejected { status, body } => BridgeError::Status {
                status,
                message: body,
            },
            SlackError::Payload(msg) => BridgeError::OperationFailed(msg),
            SlackError::BridgeError(e) => e,
        }
    }
}
