use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Process exit status for a run that could not complete.
pub const EXIT_CONFIGURATION: i32 = 1;
pub const EXIT_AUTHORIZATION: i32 = 2;
pub const EXIT_FATAL: i32 = 3;
/// The run completed but at least one file failed.
pub const EXIT_PARTIAL_FAILURE: i32 = 4;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("No folder named {folder_name:?} was found")]
    FolderNotFound { folder_name: String },

    #[error("{} folders are named {folder_name:?}: {}", candidates.len(), candidates.join(", "))]
    AmbiguousFolder {
        folder_name: String,
        candidates: Vec<String>,
    },

    /// Reading the source folder or the destination bucket failed
    #[error("Failed to {stage}: {source}")]
    Listing {
        stage: &'static str,
        #[source]
        source: BridgeError,
    },
}

impl SyncError {
    pub fn listing(stage: &'static str, source: BridgeError) -> Self {
        SyncError::Listing { stage, source }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Configuration(_) => EXIT_CONFIGURATION,
            SyncError::Authorization(_) => EXIT_AUTHORIZATION,
            SyncError::FolderNotFound { .. }
            | SyncError::AmbiguousFolder { .. }
            | SyncError::Listing { .. } => EXIT_FATAL,
        }
    }
}

impl From<core_auth::AuthError> for SyncError {
    fn from(error: core_auth::AuthError) -> Self {
        SyncError::Authorization(error.to_string())
    }
}

impl From<core_runtime::Error> for SyncError {
    fn from(error: core_runtime::Error) -> Self {
        SyncError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
