//! S3-backed marker store

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ServerSideEncryption, StorageClass};
use aws_sdk_s3::Client;
use bridge_traits::object_store::{Encryption, KeyListing, MarkerObject, ObjectStore, StorageTier};
use core_runtime::MirrorConfig;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{is_not_found, Result, S3Error};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest page `ListObjectsV2` returns.
const MAX_LIST_PAGE: u32 = 1000;

/// Client settings for one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores; `None` uses AWS.
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Attempts per operation under the SDK's standard retry mode.
    pub max_attempts: u32,
    pub operation_timeout: Duration,
}

impl S3Settings {
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            bucket: config.bucket_name.clone(),
            endpoint: config.s3_endpoint.clone(),
            force_path_style: config.s3_force_path_style,
            max_attempts: config.max_retry_attempts,
            operation_timeout: config.http_timeout,
        }
    }
}

/// `ObjectStore` over a single S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the AWS environment chain plus `settings`.
    pub async fn connect(settings: S3Settings) -> Result<Self> {
        let retry = RetryConfig::standard().with_max_attempts(settings.max_attempts.max(1));
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .operation_timeout(settings.operation_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(retry)
            .timeout_config(timeouts);
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        if sdk_config.region().is_none() {
            return Err(S3Error::Configuration(
                "no AWS region configured (set AWS_REGION or a profile region)".to_string(),
            ));
        }

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        info!(
            bucket = %settings.bucket,
            endpoint = settings.endpoint.as_deref().unwrap_or("aws"),
            path_style = settings.force_path_style,
            "S3 client configured"
        );

        Ok(Self::from_client(Client::from_conf(s3_config), settings.bucket))
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_keys_inner(&self, prefix: &str, listing: KeyListing) -> Result<HashSet<String>> {
        let mut keys = HashSet::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if !prefix.is_empty() {
                request = request.prefix(prefix);
            }
            if let KeyListing::Window { max_keys } = listing {
                request = request.max_keys(clamp_max_keys(max_keys));
            }
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(|e| S3Error::from_sdk("ListObjectsV2", &self.bucket, &e))?;
            pages += 1;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );

            let truncated = output.is_truncated().unwrap_or(false);
            if let KeyListing::Window { max_keys } = listing {
                if truncated {
                    warn!(
                        bucket = %self.bucket,
                        max_keys,
                        "Listing window truncated; keys beyond it are not checked"
                    );
                }
                break;
            }

            match output.next_continuation_token() {
                Some(token) if truncated && !token.is_empty() => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(bucket = %self.bucket, pages, keys = keys.len(), "Listed bucket keys");
        Ok(keys)
    }
}

/// `max-keys` for a window listing: at least 1, at most one page.
pub fn clamp_max_keys(max_keys: u32) -> i32 {
    max_keys.clamp(1, MAX_LIST_PAGE) as i32
}

pub fn storage_class(tier: StorageTier) -> StorageClass {
    match tier {
        StorageTier::Standard => StorageClass::Standard,
        StorageTier::InfrequentAccess => StorageClass::StandardIa,
    }
}

pub fn server_side_encryption(encryption: Encryption) -> ServerSideEncryption {
    match encryption {
        Encryption::Aes256 => ServerSideEncryption::Aes256,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_keys(
        &self,
        prefix: &str,
        listing: KeyListing,
    ) -> bridge_traits::error::Result<HashSet<String>> {
        Ok(self.list_keys_inner(prefix, listing).await?)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn exists(&self, key: &str) -> bridge_traits::error::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(S3Error::from_sdk("HeadObject", &self.bucket, &e).into()),
        }
    }

    #[instrument(skip(self, marker), fields(bucket = %self.bucket, key = %marker.key))]
    async fn put_marker(&self, marker: &MarkerObject) -> bridge_traits::error::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&marker.key)
            .body(ByteStream::from_static(&[]))
            .content_length(0)
            .server_side_encryption(server_side_encryption(marker.encryption))
            .storage_class(storage_class(marker.storage_tier))
            .send()
            .await
            .map_err(|e| S3Error::from_sdk("PutObject", &self.bucket, &e))?;

        debug!(
            storage_class = marker.storage_tier.as_str(),
            encryption = marker.encryption.as_str(),
            "Marker object written"
        );
        Ok(())
    }
}
