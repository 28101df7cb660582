//! # Mirror Configuration Module
//!
//! Provides the validated settings for one mirror run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `MirrorConfig`. Required settings are checked together so a bad cron
//! entry reports every missing variable at once, then ranges and URLs are
//! validated before any network call is made.
//!
//! ## Required Settings
//!
//! - `FOLDER_NAME` - display name of the source folder
//! - `BUCKET_NAME` - destination bucket
//! - `SLACK_WEBHOOK` - incoming webhook URL
//! - `SLACK_CHANNEL` - channel the webhook posts to
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::MirrorConfig;
//!
//! let config = MirrorConfig::builder()
//!     .folder_name("Invoices")
//!     .bucket_name("invoice-markers")
//!     .slack_webhook("https://hooks.slack.com/services/T000/B000/XXX")
//!     .slack_channel("#billing")
//!     .result_limit(50)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::MirrorConfig;
//!
//! // Fails naming FOLDER_NAME, BUCKET_NAME, SLACK_WEBHOOK and SLACK_CHANNEL
//! let config = MirrorConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required settings");
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SLACK_USERNAME: &str = "Notifier bot";
pub const DEFAULT_RESULT_LIMIT: usize = 20;
pub const MAX_RESULT_LIMIT: usize = 1000;
pub const DEFAULT_LIST_MAX_KEYS: u32 = 1000;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials/credentials.json";
pub const DEFAULT_TOKEN_PATH: &str = "credentials/token.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// How the destination's existing keys are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupStrategy {
    /// One listing page capped at `list_max_keys`. Keys beyond the window
    /// are missed and their files get mirrored (and announced) again.
    ListWindow,
    /// Paginate the whole listing under the key prefix.
    #[default]
    ListAll,
    /// Skip listing; check each candidate key individually.
    HeadEach,
}

impl DedupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupStrategy::ListWindow => "list-window",
            DedupStrategy::ListAll => "list-all",
            DedupStrategy::HeadEach => "head-each",
        }
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DedupStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "list-window" => Ok(Self::ListWindow),
            "list-all" => Ok(Self::ListAll),
            "head-each" => Ok(Self::HeadEach),
            other => Err(Error::Config(format!(
                "Unknown DEDUP_STRATEGY '{}' (expected list-all, list-window or head-each)",
                other
            ))),
        }
    }
}

/// Where OAuth tokens are persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// JSON file at `token_path`
    #[default]
    File,
    /// OS keychain
    Keyring,
}

impl TokenStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStoreKind::File => "file",
            TokenStoreKind::Keyring => "keyring",
        }
    }
}

impl fmt::Display for TokenStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" | "keychain" => Ok(Self::Keyring),
            other => Err(Error::Config(format!(
                "Unknown TOKEN_STORE '{}' (expected file or keyring)",
                other
            ))),
        }
    }
}

/// Validated settings for one mirror run.
///
/// Use [`MirrorConfigBuilder`] to construct instances.
#[derive(Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Display name of the source folder
    pub folder_name: String,
    /// Destination bucket
    pub bucket_name: String,
    /// Incoming webhook URL. Treated as a secret.
    pub slack_webhook: String,
    pub slack_channel: String,
    pub slack_username: String,
    /// Maximum number of source files considered per run
    pub result_limit: usize,
    pub dedup_strategy: DedupStrategy,
    /// Page size for [`DedupStrategy::ListWindow`]
    pub list_max_keys: u32,
    /// Prepended to every marker key
    pub key_prefix: String,
    /// Files processed in parallel by the writer
    pub concurrency: usize,
    /// Abort instead of picking the first of several same-named folders
    pub strict_folder_match: bool,
    /// Report candidates without writing or notifying
    pub dry_run: bool,
    /// OAuth client descriptor
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub token_store: TokenStoreKind,
    pub http_timeout: Duration,
    /// Attempts per retried call, including the first
    pub max_retry_attempts: u32,
    /// Custom endpoint for S3-compatible stores
    pub s3_endpoint: Option<String>,
    pub s3_force_path_style: bool,
}

impl fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("folder_name", &self.folder_name)
            .field("bucket_name", &self.bucket_name)
            .field("slack_webhook", &"[REDACTED]")
            .field("slack_channel", &self.slack_channel)
            .field("slack_username", &self.slack_username)
            .field("result_limit", &self.result_limit)
            .field("dedup_strategy", &self.dedup_strategy)
            .field("list_max_keys", &self.list_max_keys)
            .field("key_prefix", &self.key_prefix)
            .field("concurrency", &self.concurrency)
            .field("strict_folder_match", &self.strict_folder_match)
            .field("dry_run", &self.dry_run)
            .field("credentials_path", &self.credentials_path)
            .field("token_path", &self.token_path)
            .field("token_store", &self.token_store)
            .field("http_timeout", &self.http_timeout)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_force_path_style", &self.s3_force_path_style)
            .finish()
    }
}

impl MirrorConfig {
    /// Creates a new builder for constructing a `MirrorConfig`.
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Validates ranges, URLs and names.
    ///
    /// Called by [`MirrorConfigBuilder::build`]; exposed for configs
    /// mutated after construction.
    pub fn validate(&self) -> Result<()> {
        if self.result_limit == 0 || self.result_limit > MAX_RESULT_LIMIT {
            return Err(Error::Config(format!(
                "RESULT_LIMIT must be between 1 and {}, got {}",
                MAX_RESULT_LIMIT, self.result_limit
            )));
        }

        if self.list_max_keys == 0 || self.list_max_keys > DEFAULT_LIST_MAX_KEYS {
            return Err(Error::Config(format!(
                "LIST_MAX_KEYS must be between 1 and {}, got {}",
                DEFAULT_LIST_MAX_KEYS, self.list_max_keys
            )));
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(Error::Config(format!(
                "MIRROR_CONCURRENCY must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }

        if self.max_retry_attempts == 0 || self.max_retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(Error::Config(format!(
                "MAX_RETRY_ATTEMPTS must be between 1 and {}, got {}",
                MAX_RETRY_ATTEMPTS, self.max_retry_attempts
            )));
        }

        if self.http_timeout.is_zero() {
            return Err(Error::Config(
                "HTTP_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.slack_username.trim().is_empty() {
            return Err(Error::Config("SLACK_USERNAME cannot be empty".to_string()));
        }

        validate_webhook_url(&self.slack_webhook)?;

        if let Some(endpoint) = &self.s3_endpoint {
            Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("S3_ENDPOINT is not a valid URL: {}", e)))?;
        }

        if self.credentials_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "GOOGLE_CREDENTIALS_PATH cannot be empty".to_string(),
            ));
        }

        if self.token_store == TokenStoreKind::File && self.token_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "GOOGLE_TOKEN_PATH cannot be empty when TOKEN_STORE=file".to_string(),
            ));
        }

        Ok(())
    }

    /// Destination key for a source file id.
    pub fn marker_key(&self, file_id: &str) -> String {
        format!("{}{}", self.key_prefix, file_id)
    }

    /// Effective settings as display pairs, secrets redacted.
    pub fn effective_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("FOLDER_NAME", self.folder_name.clone()),
            ("BUCKET_NAME", self.bucket_name.clone()),
            (
                "SLACK_WEBHOOK",
                redact_if_sensitive("slack_webhook", &self.slack_webhook),
            ),
            ("SLACK_CHANNEL", self.slack_channel.clone()),
            ("SLACK_USERNAME", self.slack_username.clone()),
            ("RESULT_LIMIT", self.result_limit.to_string()),
            ("DEDUP_STRATEGY", self.dedup_strategy.to_string()),
            ("LIST_MAX_KEYS", self.list_max_keys.to_string()),
            ("KEY_PREFIX", self.key_prefix.clone()),
            ("MIRROR_CONCURRENCY", self.concurrency.to_string()),
            ("STRICT_FOLDER_MATCH", self.strict_folder_match.to_string()),
            ("DRY_RUN", self.dry_run.to_string()),
            (
                "GOOGLE_CREDENTIALS_PATH",
                self.credentials_path.display().to_string(),
            ),
            ("GOOGLE_TOKEN_PATH", self.token_path.display().to_string()),
            ("TOKEN_STORE", self.token_store.to_string()),
            ("HTTP_TIMEOUT_SECS", self.http_timeout.as_secs().to_string()),
            ("MAX_RETRY_ATTEMPTS", self.max_retry_attempts.to_string()),
            (
                "S3_ENDPOINT",
                self.s3_endpoint.clone().unwrap_or_else(|| "(aws)".to_string()),
            ),
            ("S3_FORCE_PATH_STYLE", self.s3_force_path_style.to_string()),
        ]
    }
}

/// Webhooks must be HTTPS; plain HTTP is only accepted for loopback hosts.
fn validate_webhook_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("SLACK_WEBHOOK is not a valid URL: {}", e)))?;

    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&url) => Ok(()),
        scheme => Err(Error::Config(format!(
            "SLACK_WEBHOOK must use https (got {})",
            scheme
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
        Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// Builder for constructing [`MirrorConfig`] instances.
///
/// Unset optional settings fall back to their documented defaults. Empty
/// strings count as unset for required settings.
#[derive(Debug, Default, Clone)]
pub struct MirrorConfigBuilder {
    folder_name: Option<String>,
    bucket_name: Option<String>,
    slack_webhook: Option<String>,
    slack_channel: Option<String>,
    slack_username: Option<String>,
    result_limit: Option<usize>,
    dedup_strategy: Option<DedupStrategy>,
    list_max_keys: Option<u32>,
    key_prefix: Option<String>,
    concurrency: Option<usize>,
    strict_folder_match: bool,
    dry_run: bool,
    credentials_path: Option<PathBuf>,
    token_path: Option<PathBuf>,
    token_store: Option<TokenStoreKind>,
    http_timeout: Option<Duration>,
    max_retry_attempts: Option<u32>,
    s3_endpoint: Option<String>,
    s3_force_path_style: bool,
}

impl MirrorConfigBuilder {
    pub fn folder_name(mut self, name: impl Into<String>) -> Self {
        self.folder_name = Some(name.into());
        self
    }

    pub fn bucket_name(mut self, bucket: impl Into<String>) -> Self {
        self.bucket_name = Some(bucket.into());
        self
    }

    pub fn slack_webhook(mut self, url: impl Into<String>) -> Self {
        self.slack_webhook = Some(url.into());
        self
    }

    pub fn slack_channel(mut self, channel: impl Into<String>) -> Self {
        self.slack_channel = Some(channel.into());
        self
    }

    pub fn slack_username(mut self, username: impl Into<String>) -> Self {
        self.slack_username = Some(username.into());
        self
    }

    pub fn result_limit(mut self, limit: usize) -> Self {
        self.result_limit = Some(limit);
        self
    }

    pub fn dedup_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.dedup_strategy = Some(strategy);
        self
    }

    pub fn list_max_keys(mut self, max_keys: u32) -> Self {
        self.list_max_keys = Some(max_keys);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn strict_folder_match(mut self, strict: bool) -> Self {
        self.strict_folder_match = strict;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn token_store(mut self, kind: TokenStoreKind) -> Self {
        self.token_store = Some(kind);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = Some(attempts);
        self
    }

    /// Empty strings leave the AWS default endpoint in place.
    pub fn s3_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.s3_endpoint = (!endpoint.trim().is_empty()).then_some(endpoint);
        self
    }

    pub fn s3_force_path_style(mut self, force: bool) -> Self {
        self.s3_force_path_style = force;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming every missing required variable, or
    /// the first range/URL violation found by [`MirrorConfig::validate`].
    pub fn build(self) -> Result<MirrorConfig> {
        let mut missing = Vec::new();
        let folder_name = required(self.folder_name, "FOLDER_NAME", &mut missing);
        let bucket_name = required(self.bucket_name, "BUCKET_NAME", &mut missing);
        let slack_webhook = required(self.slack_webhook, "SLACK_WEBHOOK", &mut missing);
        let slack_channel = required(self.slack_channel, "SLACK_CHANNEL", &mut missing);

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        let config = MirrorConfig {
            folder_name,
            bucket_name,
            slack_webhook,
            slack_channel,
            slack_username: self
                .slack_username
                .unwrap_or_else(|| DEFAULT_SLACK_USERNAME.to_string()),
            result_limit: self.result_limit.unwrap_or(DEFAULT_RESULT_LIMIT),
            dedup_strategy: self.dedup_strategy.unwrap_or_default(),
            list_max_keys: self.list_max_keys.unwrap_or(DEFAULT_LIST_MAX_KEYS),
            key_prefix: self.key_prefix.unwrap_or_default(),
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            strict_folder_match: self.strict_folder_match,
            dry_run: self.dry_run,
            credentials_path: self
                .credentials_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            token_path: self
                .token_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH)),
            token_store: self.token_store.unwrap_or_default(),
            http_timeout: self
                .http_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
            max_retry_attempts: self
                .max_retry_attempts
                .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS),
            s3_endpoint: self.s3_endpoint,
            s3_force_path_style: self.s3_force_path_style,
        };

        config.validate()?;
        Ok(config)
    }
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => {
            missing.push(name);
            String::new()
        }
    }
}
