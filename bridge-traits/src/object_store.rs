//! Object Storage Abstraction
//!
//! The write side of a mirror run. The bucket's key set is the
//! de-duplication ledger: a key's presence means "already mirrored".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::Result;

/// Storage tier applied to marker objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageTier {
    Standard,
    /// Infrequent-access class (`STANDARD_IA`)
    #[default]
    InfrequentAccess,
}

impl StorageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Standard => "STANDARD",
            StorageTier::InfrequentAccess => "STANDARD_IA",
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side encryption applied to marker objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encryption {
    #[default]
    Aes256,
}

impl Encryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encryption::Aes256 => "AES256",
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A zero-byte object whose key alone records that a source file was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerObject {
    pub key: String,
    pub storage_tier: StorageTier,
    pub encryption: Encryption,
}

impl MarkerObject {
    /// Marker with the fixed tier and encryption used for every mirrored file.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            storage_tier: StorageTier::InfrequentAccess,
            encryption: Encryption::Aes256,
        }
    }
}

/// How much of the bucket to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyListing {
    /// One page of at most `max_keys` keys; anything beyond is not seen
    Window { max_keys: u32 },
    /// Follow continuation tokens until the listing is exhausted
    Exhaustive,
}

/// Object storage capability.
///
/// Implemented by `provider-s3`; tests supply in-memory fakes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List existing keys under `prefix`.
    async fn list_keys(&self, prefix: &str, listing: KeyListing) -> Result<HashSet<String>>;

    /// Check whether a single key exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Create (or overwrite) a marker object with an empty body.
    async fn put_marker(&self, marker: &MarkerObject) -> Result<()>;
}
