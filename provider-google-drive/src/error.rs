//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// No usable access token, or the API rejected it
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit still exceeded after the retry budget
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<core_auth::AuthError> for GoogleDriveError {
    fn from(error: core_auth::AuthError) -> Self {
        GoogleDriveError::AuthenticationFailed(error.to_string())
    }
}

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::AuthenticationFailed(msg) => {
                BridgeError::NotAvailable(format!("Google Drive authentication failed: {}", msg))
            }
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => BridgeError::Status {
                status: status_code,
                message,
            },
            GoogleDriveError::RateLimitExceeded { attempts } => BridgeError::Status {
                status: 429,
                message: format!("rate limited after {} attempts", attempts),
            },
            GoogleDriveError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GoogleDriveError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 404,
            message: "File not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 404): File not found"
        );
    }

    #[test]
    fn test_error_conversion() {
        let bridge_error: BridgeError =
            GoogleDriveError::AuthenticationFailed("Token expired".to_string()).into();
        assert!(matches!(bridge_error, BridgeError::NotAvailable(_)));

        let bridge_error: BridgeError = GoogleDriveError::ApiError {
            status_code: 503,
            message: "backend".to_string(),
        }
        .into();
        assert!(bridge_error.is_transient());

        let bridge_error: BridgeError = GoogleDriveError::RateLimitExceeded { attempts: 3 }.into();
        assert!(matches!(bridge_error, BridgeError::Status { status: 429, .. }));
    }

    #[test]
    fn test_auth_error_conversion() {
        let error: GoogleDriveError =
            core_auth::AuthError::InteractionRequired("no token".to_string()).into();
        assert!(matches!(error, GoogleDriveError::AuthenticationFailed(_)));
    }
}
