//! Secure Token Storage
//!
//! Persists OAuth tokens between runs through the `SecureStore` bridge
//! (token file or OS keychain).
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{OAuthTokens, TokenStore, DEFAULT_USER_ID};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! let tokens = OAuthTokens::new(
//!     "access_token_value".to_string(),
//!     Some("refresh_token_value".to_string()),
//!     3600,
//! );
//!
//! token_store.store_tokens(DEFAULT_USER_ID, &tokens).await?;
//! let retrieved = token_store.retrieve_tokens(DEFAULT_USER_ID).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::storage::SecureStore;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// User id the job stores its single credential under.
pub const DEFAULT_USER_ID: &str = "default";

const KEY_PREFIX: &str = "drive_mirror.oauth.";

/// Secure storage for OAuth tokens
///
/// # Security Considerations
///
/// - Tokens are serialized to JSON before storage
/// - Token values are never logged
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

/// On-disk shape of a token set.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: Option<String>,
    /// Unix seconds
    expires_at: i64,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    fn storage_key(&self, user_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, user_id)
    }

    /// Store OAuth tokens for a user, replacing any previous set.
    pub async fn store_tokens(&self, user_id: &str, tokens: &OAuthTokens) -> Result<()> {
        let stored = StoredTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at.timestamp(),
        };

        let json = serde_json::to_vec(&stored).map_err(|e| AuthError::SerializationFailed {
            context: "token serialization".to_string(),
            reason: e.to_string(),
        })?;

        self.secure_store
            .set_secret(&self.storage_key(user_id), &json)
            .await
            .map_err(|e| {
                warn!(user_id, error = %e, "Failed to store tokens in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            user_id,
            has_refresh_token = stored.refresh_token.is_some(),
            "Tokens stored"
        );

        Ok(())
    }

    /// Retrieve OAuth tokens for a user.
    ///
    /// Returns:
    /// - `Ok(Some(tokens))` if tokens exist and are valid
    /// - `Ok(None)` if no tokens exist
    /// - `Err(TokenCorrupted)` if the stored value cannot be parsed; the
    ///   entry is deleted so the next run starts a fresh authorization
    pub async fn retrieve_tokens(&self, user_id: &str) -> Result<Option<OAuthTokens>> {
        let key = self.storage_key(user_id);

        let data = self.secure_store.get_secret(&key).await.map_err(|e| {
            warn!(user_id, error = %e, "Failed to retrieve tokens from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!(user_id, "No tokens found in storage");
            return Ok(None);
        };

        let stored: StoredTokens = match serde_json::from_slice(&data) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to deserialize tokens, they may be corrupted");

                if let Err(delete_err) = self.secure_store.delete_secret(&key).await {
                    warn!(user_id, error = %delete_err, "Failed to delete corrupted token data");
                }

                return Err(AuthError::TokenCorrupted {
                    reason: e.to_string(),
                });
            }
        };

        let expires_at = DateTime::from_timestamp(stored.expires_at, 0).ok_or_else(|| {
            AuthError::TokenCorrupted {
                reason: format!("expiry {} is out of range", stored.expires_at),
            }
        })?;

        debug!(
            user_id,
            has_refresh_token = stored.refresh_token.is_some(),
            expires_at = stored.expires_at,
            "Tokens retrieved"
        );

        Ok(Some(OAuthTokens {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at,
        }))
    }

    /// Delete OAuth tokens for a user. Idempotent.
    pub async fn delete_tokens(&self, user_id: &str) -> Result<()> {
        self.secure_store
            .delete_secret(&self.storage_key(user_id))
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        info!(user_id, "Tokens deleted");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory secure store shared by the crate's tests.
    #[derive(Default)]
    pub(crate) struct MemorySecureStore {
        pub(crate) data: Mutex<HashMap<String, Vec<u8>>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            if self.fail {
                return Err(BridgeError::NotAvailable("store offline".to_string()));
            }
            self.data.lock().await.insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            if self.fail {
                return Err(BridgeError::NotAvailable("store offline".to_string()));
            }
            Ok(self.data.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().await.remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));
        let tokens = OAuthTokens::new("ya29".to_string(), Some("1//r".to_string()), 3600);

        assert!(store.retrieve_tokens(DEFAULT_USER_ID).await.unwrap().is_none());

        store.store_tokens(DEFAULT_USER_ID, &tokens).await.unwrap();
        let retrieved = store.retrieve_tokens(DEFAULT_USER_ID).await.unwrap().unwrap();

        assert_eq!(retrieved.access_token, "ya29");
        assert_eq!(retrieved.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(retrieved.expires_at.timestamp(), tokens.expires_at.timestamp());

        store.delete_tokens(DEFAULT_USER_ID).await.unwrap();
        assert!(store.retrieve_tokens(DEFAULT_USER_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_tokens_are_deleted() {
        let secure = Arc::new(MemorySecureStore::default());
        secure
            .set_secret("drive_mirror.oauth.default", b"garbage")
            .await
            .unwrap();

        let store = TokenStore::new(secure.clone());
        let err = store.retrieve_tokens(DEFAULT_USER_ID).await.unwrap_err();

        assert!(matches!(err, AuthError::TokenCorrupted { .. }));
        assert!(secure.data.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let store = TokenStore::new(Arc::new(MemorySecureStore {
            fail: true,
            ..Default::default()
        }));

        let err = store.retrieve_tokens(DEFAULT_USER_ID).await.unwrap_err();
        assert!(matches!(err, AuthError::SecureStorageUnavailable(_)));
    }
}
