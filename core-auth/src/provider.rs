//! Credential Providers
//!
//! The mirror pipeline only needs a bearer token. How that token is obtained
//! (stored and refreshed, or by walking an operator through consent) sits
//! behind [`CredentialProvider`].
//!
//! ```text
//! StoredTokenProvider ── no token ──> InteractionRequired
//!        │                                   │
//!        │                        InteractiveProvider:
//!        │                        print URL, read code,
//!        │                        exchange, store
//!        v                                   v
//!   cached / refreshed token  <──────────────┘
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::token_store::{TokenStore, DEFAULT_USER_ID};
use crate::types::OAuthTokens;
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Source of access tokens for the listing API.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a bearer token valid for at least the expiry buffer.
    async fn access_token(&self) -> Result<String>;
}

/// Asks an operator for an authorization code.
#[async_trait]
pub trait CodePrompt: Send + Sync {
    /// Show `auth_url` and return the code the operator pastes back.
    async fn request_code(&self, auth_url: &str) -> Result<String>;
}

/// Prompts on stderr and reads one line from stdin.
#[derive(Debug, Default, Clone)]
pub struct StdinCodePrompt;

#[async_trait]
impl CodePrompt for StdinCodePrompt {
    async fn request_code(&self, auth_url: &str) -> Result<String> {
        let auth_url = auth_url.to_string();

        tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            writeln!(
                stderr,
                "Open the following URL in the browser and enter the resulting code after authorization:\n{}",
                auth_url
            )
            .and_then(|_| write!(stderr, "Code: "))
            .and_then(|_| stderr.flush())
            .map_err(|e| AuthError::Other(format!("Failed to write prompt: {}", e)))?;

            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| AuthError::Other(format!("Failed to read code: {}", e)))?;

            Ok(line.trim().to_string())
        })
        .await
        .map_err(|e| AuthError::Other(format!("Prompt task failed: {}", e)))?
    }
}

/// Run the consent flow once and persist the resulting tokens.
#[instrument(skip_all)]
pub async fn authorize_interactively(
    flow: &OAuthFlowManager,
    prompt: &dyn CodePrompt,
    token_store: &TokenStore,
) -> Result<OAuthTokens> {
    let (auth_url, verifier) = flow.build_auth_url()?;
    let code = prompt.request_code(&auth_url).await?;
    let tokens = flow.exchange_code(&code, &verifier).await?;

    if !tokens.can_refresh() {
        warn!("Token endpoint issued no refresh token; unattended runs will need re-authorization");
    }

    token_store.store_tokens(DEFAULT_USER_ID, &tokens).await?;
    info!("Authorization complete");
    Ok(tokens)
}

/// Loads persisted tokens and refreshes them when they expire.
///
/// The current token set is cached for the life of the provider, so a run
/// reads the store once and refreshes at most when the cached token ages out.
pub struct StoredTokenProvider {
    token_store: TokenStore,
    flow: Arc<OAuthFlowManager>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<OAuthTokens>>,
}

impl StoredTokenProvider {
    pub fn new(token_store: TokenStore, flow: Arc<OAuthFlowManager>) -> Self {
        Self {
            token_store,
            flow,
            clock: Arc::new(SystemClock),
            cached: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the cache, e.g. with tokens from a just-finished consent flow.
    pub async fn set_tokens(&self, tokens: OAuthTokens) {
        *self.cached.lock().await = Some(tokens);
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.token_store
    }

    pub fn flow(&self) -> &Arc<OAuthFlowManager> {
        &self.flow
    }
}

#[async_trait]
impl CredentialProvider for StoredTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        let tokens = match cached.take() {
            Some(tokens) => tokens,
            None => self
                .token_store
                .retrieve_tokens(DEFAULT_USER_ID)
                .await?
                .ok_or_else(|| {
                    AuthError::InteractionRequired(
                        "no stored token; run `drive-mirror authorize` from a terminal".to_string(),
                    )
                })?,
        };

        if !tokens.is_expired_at(self.clock.now()) {
            let access_token = tokens.access_token.clone();
            *cached = Some(tokens);
            return Ok(access_token);
        }

        let Some(refresh_token) = tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(AuthError::InteractionRequired(
                "stored token expired and has no refresh token".to_string(),
            ));
        };

        debug!(expires_at = %tokens.expires_at, "Access token expired, refreshing");
        let refreshed = self.flow.refresh_access_token(refresh_token).await?;
        self.token_store
            .store_tokens(DEFAULT_USER_ID, &refreshed)
            .await?;

        let access_token = refreshed.access_token.clone();
        *cached = Some(refreshed);
        Ok(access_token)
    }
}

/// Falls back to the consent flow when no usable token is stored.
pub struct InteractiveProvider {
    stored: StoredTokenProvider,
    prompt: Arc<dyn CodePrompt>,
}

impl InteractiveProvider {
    pub fn new(stored: StoredTokenProvider, prompt: Arc<dyn CodePrompt>) -> Self {
        Self { stored, prompt }
    }
}

#[async_trait]
impl CredentialProvider for InteractiveProvider {
    async fn access_token(&self) -> Result<String> {
        match self.stored.access_token().await {
            Err(AuthError::InteractionRequired(reason)) => {
                info!(reason = %reason, "Starting interactive authorization");
            }
            // A revoked refresh token also needs fresh consent.
            Err(AuthError::TokenRefreshFailed(reason)) => {
                warn!(reason = %reason, "Token refresh failed, starting interactive authorization");
            }
            Err(AuthError::TokenCorrupted { reason }) => {
                warn!(reason = %reason, "Stored token unreadable, starting interactive authorization");
            }
            other => return other,
        }

        let tokens = authorize_interactively(
            self.stored.flow(),
            self.prompt.as_ref(),
            self.stored.token_store(),
        )
        .await?;

        let access_token = tokens.access_token.clone();
        self.stored.set_tokens(tokens).await;
        Ok(access_token)
    }
}
