//! `drive-mirror`: mirror new files from a Google Drive folder into an S3
//! bucket as zero-byte marker objects and announce each one on Slack.
//!
//! Exit status: 0 success, 1 configuration error, 2 authorization error,
//! 3 fatal run error, 4 run completed with per-file failures.

mod cli;

use anyhow::Context;
use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
use bridge_traits::http::{HttpClient, RetryPolicy};
use bridge_traits::storage::SecureStore;
use clap::Parser;
use cli::{Cli, Command, ConfigArgs, LogArgs, RunArgs};
use core_auth::{
    authorize_interactively, AuthError, ClientSecrets, CredentialProvider, InteractiveProvider,
    OAuthFlowManager, StdinCodePrompt, StoredTokenProvider, TokenStore,
};
use core_runtime::config::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_RETRY_ATTEMPTS};
use core_runtime::logging::{init_logging, strip_path, LoggingConfig};
use core_runtime::{MirrorConfig, TokenStoreKind};
use core_sync::{MirrorCoordinator, SyncError, EXIT_AUTHORIZATION, EXIT_CONFIGURATION, EXIT_FATAL};
use provider_google_drive::GoogleDriveConnector;
use provider_s3::{S3Error, S3ObjectStore, S3Settings};
use provider_slack::SlackWebhookNotifier;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so clap's env fallbacks see its values.
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_CONFIGURATION as u8)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(logging_config(&cli.logging)) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_mirror(&cli.config, &cli.run).await,
        Command::Authorize => authorize(&cli.config).await,
        Command::CheckConfig => check_config(&cli.config),
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            let code = exit_code_for(&e);
            error!(exit_code = code, "{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(code as u8)
        }
    }
}

fn logging_config(args: &LogArgs) -> LoggingConfig {
    let mut config = LoggingConfig::default();
    if let Some(level) = args.log_level {
        config = config.with_level(level);
    }
    if let Some(format) = args.log_format {
        config = config.with_format(format);
    }
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_filter(filter);
    }
    config
}

/// Map a failure to the process exit status.
fn exit_code_for(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<SyncError>() {
        return e.exit_code();
    }
    if error.downcast_ref::<core_runtime::Error>().is_some() {
        return EXIT_CONFIGURATION;
    }
    if let Some(S3Error::Configuration(_)) = error.downcast_ref::<S3Error>() {
        return EXIT_CONFIGURATION;
    }
    if error.downcast_ref::<AuthError>().is_some() {
        return EXIT_AUTHORIZATION;
    }
    EXIT_FATAL
}

fn http_client(timeout: Duration, max_attempts: u32) -> anyhow::Result<Arc<dyn HttpClient>> {
    let client = ReqwestHttpClient::with_timeout(timeout)
        .context("failed to build HTTP client")?
        .with_retry_policy(RetryPolicy::with_max_attempts(max_attempts));
    Ok(Arc::new(client))
}

fn secure_store(kind: TokenStoreKind, token_path: &Path) -> anyhow::Result<Arc<dyn SecureStore>> {
    match kind {
        TokenStoreKind::File => Ok(Arc::new(FileSecureStore::new(token_path))),
        #[cfg(feature = "secure-store")]
        TokenStoreKind::Keyring => Ok(Arc::new(bridge_desktop::KeyringSecureStore::new())),
        #[cfg(not(feature = "secure-store"))]
        TokenStoreKind::Keyring => Err(core_runtime::Error::Config(
            "TOKEN_STORE=keyring requires the secure-store feature".to_string(),
        )
        .into()),
    }
}

async fn oauth_flow(
    credentials_path: &Path,
    http: Arc<dyn HttpClient>,
    max_attempts: u32,
) -> anyhow::Result<Arc<OAuthFlowManager>> {
    let secrets = ClientSecrets::from_file(credentials_path).await?;
    let flow = OAuthFlowManager::new(secrets.into_oauth_config(), http)
        .with_retry_policy(RetryPolicy::with_max_attempts(max_attempts));
    Ok(Arc::new(flow))
}

async fn run_mirror(args: &ConfigArgs, run: &RunArgs) -> anyhow::Result<i32> {
    let config = args.builder().dry_run(run.dry_run).build()?;
    info!(?config, "Configuration loaded");

    let http = http_client(config.http_timeout, config.max_retry_attempts)?;
    let store = secure_store(config.token_store, &config.token_path)?;
    let flow = oauth_flow(&config.credentials_path, http.clone(), config.max_retry_attempts).await?;
    let stored = StoredTokenProvider::new(TokenStore::new(store), flow);

    let interactive = !run.non_interactive && std::io::stdin().is_terminal();
    let credentials: Arc<dyn CredentialProvider> = if interactive {
        Arc::new(InteractiveProvider::new(stored, Arc::new(StdinCodePrompt)))
    } else {
        Arc::new(stored)
    };

    let source = GoogleDriveConnector::new(http.clone(), credentials.clone())
        .with_retry_policy(RetryPolicy::with_max_attempts(config.max_retry_attempts));
    let bucket = S3ObjectStore::connect(S3Settings::from_config(&config)).await?;
    let notifier = SlackWebhookNotifier::from_config(http, &config);

    let coordinator = MirrorCoordinator::new(
        config,
        credentials,
        Arc::new(source),
        Arc::new(bucket),
        Arc::new(notifier),
    );
    let report = coordinator.run().await?;

    println!("{}", report);
    Ok(report.exit_code())
}

async fn authorize(args: &ConfigArgs) -> anyhow::Result<i32> {
    let timeout = Duration::from_secs(args.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS));
    let max_attempts = args
        .max_retry_attempts
        .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS)
        .max(1);
    let token_path = args.token_path();

    let http = http_client(timeout, max_attempts)?;
    let store = secure_store(args.token_store.unwrap_or_default(), &token_path)?;
    let flow = oauth_flow(&args.credentials_path(), http, max_attempts).await?;

    authorize_interactively(&flow, &StdinCodePrompt, &TokenStore::new(store))
        .await
        .context("authorization failed")?;

    info!(
        token_file = %strip_path(&token_path.to_string_lossy()),
        "Authorization stored"
    );
    println!("Authorization stored.");
    Ok(0)
}

fn check_config(args: &ConfigArgs) -> anyhow::Result<i32> {
    let config: MirrorConfig = args.builder().build()?;

    for (name, value) in config.effective_settings() {
        println!("{:<24} {}", name, value);
    }
    Ok(0)
}
