use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth client descriptor error: {0}")]
    ClientDescriptor(String),

    #[error("Authorization required: {0}")]
    InteractionRequired(String),

    #[error("Invalid authorization code: {0}")]
    InvalidAuthCode(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Network error during authentication: {0}")]
    NetworkError(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored tokens are corrupted: {reason}")]
    TokenCorrupted { reason: String },

    #[error("Serialization failed ({context}): {reason}")]
    SerializationFailed { context: String, reason: String },

    #[error("Authentication error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
