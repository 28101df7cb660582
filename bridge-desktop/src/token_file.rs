//! Token File Storage
//!
//! A `SecureStore` backed by a single JSON file, for hosts without an OS
//! keychain. Entries are kept as `{ "<key>": "<base64 value>" }`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// File-backed secret store.
///
/// The file is rewritten atomically (temp file + rename) and restricted to
/// the owning user on Unix.
pub struct FileSecureStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file. A missing or blank file is empty.
    async fn read_entries(&self) -> Result<Entries> {
        let raw = self.read_raw().await?;
        self.parse(&raw).map_err(|e| {
            BridgeError::OperationFailed(format!(
                "Token file {} is corrupted: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Entries to update before a write. Only a corrupted file is discarded;
    /// I/O failures propagate so the existing file is left alone.
    async fn entries_for_update(&self) -> Result<Entries> {
        let raw = self.read_raw().await?;
        Ok(self.parse(&raw).unwrap_or_else(|_| {
            warn!(path = %self.path.display(), "Replacing corrupted token file");
            Entries::new()
        }))
    }

    async fn read_raw(&self) -> Result<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn parse(&self, raw: &[u8]) -> serde_json::Result<Entries> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Entries::new());
        }

        serde_json::from_slice(raw).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Token file is not valid JSON");
            e
        })
    }

    async fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to serialize token file: {}", e))
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().await;

        // A corrupted file is replaced rather than blocking re-authorization.
        let mut entries = self.entries_for_update().await?;
        entries.insert(key.to_string(), STANDARD.encode(value));
        self.write_entries(&entries).await?;

        debug!(key = key, path = %self.path.display(), "Stored secret in token file");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;

        let entries = self.read_entries().await?;
        match entries.get(key) {
            Some(encoded) => {
                let decoded = STANDARD.decode(encoded).map_err(|e| {
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.entries_for_update().await?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries).await?;
            debug!(key = key, "Deleted secret from token file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileSecureStore::new(dir.path().join("token.json"));

        assert_eq!(store.get_secret("oauth").await.unwrap(), None);
        assert!(!store.has_secret("oauth").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let store = FileSecureStore::new(&path);

        store.set_secret("oauth", b"{\"a\":1}").await.unwrap();
        store.set_secret("other", b"\x00\x01").await.unwrap();

        assert_eq!(
            store.get_secret("oauth").await.unwrap(),
            Some(b"{\"a\":1}".to_vec())
        );
        assert!(path.exists());

        store.delete_secret("oauth").await.unwrap();
        assert_eq!(store.get_secret("oauth").await.unwrap(), None);
        assert_eq!(
            store.get_secret("other").await.unwrap(),
            Some(vec![0u8, 1u8])
        );

        // Deleting again is fine
        store.delete_secret("oauth").await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupted_file_is_reported_then_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileSecureStore::new(&path);

        assert!(store.get_secret("oauth").await.is_err());

        store.set_secret("oauth", b"fresh").await.unwrap();
        assert_eq!(
            store.get_secret("oauth").await.unwrap(),
            Some(b"fresh".to_vec())
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        // A directory at the token path cannot be read as a file.
        let path = dir.path().join("token.json");
        std::fs::create_dir(&path).unwrap();
        let store = FileSecureStore::new(&path);

        let err = store.set_secret("oauth", b"fresh").await.unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
        assert!(store.delete_secret("oauth").await.is_err());

        assert!(path.is_dir());
        assert!(!dir.path().join("token.json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        let store = FileSecureStore::new(&path);
        store.set_secret("oauth", b"secret").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
