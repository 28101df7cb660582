//! Command-line surface. Every setting can also come from the environment
//! (or a `.env` file); flags win.

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use core_runtime::config::{
    DEFAULT_CREDENTIALS_PATH, DEFAULT_TOKEN_PATH,
};
use core_runtime::logging::{LogFormat, LogLevel};
use core_runtime::{DedupStrategy, MirrorConfig, MirrorConfigBuilder, TokenStoreKind};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mirror new Google Drive files into S3 and announce them on Slack")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LogArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Perform one mirror run (default)
    Run,
    /// Run the OAuth consent flow and store the token for unattended runs
    Authorize,
    /// Validate configuration and print the effective settings
    CheckConfig,
}

/// Flags for a mirror run, accepted with or without the `run` subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Report what would be mirrored without writing or notifying
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Fail instead of prompting when no usable token is stored
    #[arg(long, global = true)]
    pub non_interactive: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Display name of the Drive folder to mirror
    #[arg(long, env = "FOLDER_NAME", global = true)]
    pub folder_name: Option<String>,

    /// Destination S3 bucket
    #[arg(long, env = "BUCKET_NAME", global = true)]
    pub bucket_name: Option<String>,

    /// Slack incoming-webhook URL
    #[arg(long, env = "SLACK_WEBHOOK", hide_env_values = true, global = true)]
    pub slack_webhook: Option<String>,

    /// Slack channel to post to
    #[arg(long, env = "SLACK_CHANNEL", global = true)]
    pub slack_channel: Option<String>,

    /// Bot display name
    #[arg(long, env = "SLACK_USERNAME", global = true)]
    pub slack_username: Option<String>,

    /// Newest files to consider per run (1-1000)
    #[arg(long, env = "RESULT_LIMIT", global = true)]
    pub result_limit: Option<usize>,

    /// How existing markers are discovered: list-all, list-window or head-each
    #[arg(long, env = "DEDUP_STRATEGY", global = true)]
    pub dedup_strategy: Option<DedupStrategy>,

    /// Page size for the list-window strategy (1-1000)
    #[arg(long, env = "LIST_MAX_KEYS", global = true)]
    pub list_max_keys: Option<u32>,

    /// Prefix prepended to every marker key
    #[arg(long, env = "KEY_PREFIX", global = true)]
    pub key_prefix: Option<String>,

    /// Files processed in parallel (1-16)
    #[arg(long, env = "MIRROR_CONCURRENCY", global = true)]
    pub concurrency: Option<usize>,

    /// Abort when several folders share the configured name
    #[arg(
        long,
        env = "STRICT_FOLDER_MATCH",
        global = true,
        value_parser = BoolishValueParser::new()
    )]
    pub strict_folder_match: bool,

    /// OAuth client descriptor downloaded from the Cloud console
    #[arg(long, env = "GOOGLE_CREDENTIALS_PATH", global = true)]
    pub credentials_path: Option<PathBuf>,

    /// Token file used by the file token store
    #[arg(long, env = "GOOGLE_TOKEN_PATH", global = true)]
    pub token_path: Option<PathBuf>,

    /// Token storage backend: file or keyring
    #[arg(long, env = "TOKEN_STORE", global = true)]
    pub token_store: Option<TokenStoreKind>,

    /// Per-request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", global = true)]
    pub http_timeout_secs: Option<u64>,

    /// Attempts per API call for transient failures (1-10)
    #[arg(long, env = "MAX_RETRY_ATTEMPTS", global = true)]
    pub max_retry_attempts: Option<u32>,

    /// Custom endpoint for S3-compatible storage
    #[arg(long, env = "S3_ENDPOINT", global = true)]
    pub s3_endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(
        long,
        env = "S3_FORCE_PATH_STYLE",
        global = true,
        value_parser = BoolishValueParser::new()
    )]
    pub s3_force_path_style: bool,
}

impl ConfigArgs {
    /// Builder seeded with every value that was supplied.
    pub fn builder(&self) -> MirrorConfigBuilder {
        let mut builder = MirrorConfig::builder()
            .strict_folder_match(self.strict_folder_match)
            .s3_force_path_style(self.s3_force_path_style);

        if let Some(v) = &self.folder_name {
            builder = builder.folder_name(v.clone());
        }
        if let Some(v) = &self.bucket_name {
            builder = builder.bucket_name(v.clone());
        }
        if let Some(v) = &self.slack_webhook {
            builder = builder.slack_webhook(v.clone());
        }
        if let Some(v) = &self.slack_channel {
            builder = builder.slack_channel(v.clone());
        }
        if let Some(v) = &self.slack_username {
            builder = builder.slack_username(v.clone());
        }
        if let Some(v) = self.result_limit {
            builder = builder.result_limit(v);
        }
        if let Some(v) = self.dedup_strategy {
            builder = builder.dedup_strategy(v);
        }
        if let Some(v) = self.list_max_keys {
            builder = builder.list_max_keys(v);
        }
        if let Some(v) = &self.key_prefix {
            builder = builder.key_prefix(v.clone());
        }
        if let Some(v) = self.concurrency {
            builder = builder.concurrency(v);
        }
        if let Some(v) = &self.credentials_path {
            builder = builder.credentials_path(v.clone());
        }
        if let Some(v) = &self.token_path {
            builder = builder.token_path(v.clone());
        }
        if let Some(v) = self.token_store {
            builder = builder.token_store(v);
        }
        if let Some(v) = self.http_timeout_secs {
            builder = builder.http_timeout(Duration::from_secs(v));
        }
        if let Some(v) = self.max_retry_attempts {
            builder = builder.max_retry_attempts(v);
        }
        if let Some(v) = &self.s3_endpoint {
            builder = builder.s3_endpoint(v.clone());
        }
        builder
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH))
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH))
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct LogArgs {
    /// trace, debug, info, warn or error
    #[arg(long, env = "LOG_LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// pretty, json or compact
    #[arg(long, env = "LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,
}
