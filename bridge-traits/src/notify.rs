//! Chat Notification Abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Announcement of one newly mirrored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub file_name: String,
    pub file_id: String,
}

impl Notification {
    pub fn new(file_name: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_id: file_id.into(),
        }
    }

    /// Message body posted to the chat channel.
    pub fn text(&self) -> String {
        format!(
            "new file uploaded, name: {}, id: {}",
            self.file_name, self.file_id
        )
    }
}

/// Chat notification capability.
///
/// Delivery is best effort: callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}
