//! OAuth 2.0 Authorization Flow Manager with PKCE Support
//!
//! This module implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for the
//! installed-application flow.
//!
//! # Overview
//!
//! The OAuth flow manager handles:
//! - Building authorization URLs with PKCE challenge
//! - Exchanging authorization codes for tokens
//! - Refreshing access tokens
//!
//! # Security
//!
//! - Uses PKCE (Proof Key for Code Exchange) so a leaked code is useless
//!   without the verifier
//! - Generates cryptographically secure random state and code verifier
//! - Never logs sensitive values (tokens, codes, verifiers)
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthFlowManager, OAuthConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig {
//!     client_id: "your-client-id".to_string(),
//!     client_secret: Some("your-client-secret".to_string()),
//!     redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
//!     scopes: vec!["https://www.googleapis.com/auth/drive.metadata.readonly".to_string()],
//!     auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
//!     token_url: "https://oauth2.googleapis.com/token".to_string(),
//! };
//!
//! let flow_manager = OAuthFlowManager::new(config, http_client);
//! let (auth_url, pkce_verifier) = flow_manager.build_auth_url()?;
//! // Show auth_url to the operator, read back the code...
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// OAuth 2.0 client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (optional for public clients)
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// List of OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// # Security
///
/// The verifier must be kept secret and never transmitted to the
/// authorization server. Only the challenge is sent during authorization.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    /// The code verifier (base64-url-encoded random string)
    verifier: String,
    /// The state parameter for CSRF protection
    state: String,
}

impl PkceVerifier {
    /// Create a new PKCE verifier with cryptographically secure random values.
    ///
    /// Generates a 32-byte code verifier and a 16-byte state, both
    /// URL-safe base64 without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        // 43 characters after encoding, within RFC 7636's 43-128
        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    /// Get the code verifier string.
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Get the state parameter.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Compute the code challenge from the verifier.
    ///
    /// Uses S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        let hash = hasher.finalize();
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth 2.0 flow manager.
///
/// Handles the authorization code flow with PKCE and token refresh.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            clock: Arc::new(SystemClock),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Time source used to stamp token expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Retry policy for token refresh. Code exchange is never retried.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Returns the URL and the PKCE verifier, which must be kept for
    /// [`exchange_code`](Self::exchange_code).
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization URL cannot be parsed.
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
            query.append_pair("access_type", "offline"); // Request refresh token
            query.append_pair("prompt", "consent");
        }

        debug!("Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for OAuth tokens.
    ///
    /// With the out-of-band redirect the operator pastes only the code, so
    /// there is no callback state to compare; PKCE binds the code to this
    /// flow instead. A code is single-use, so the call is made once.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code is empty or rejected by the token endpoint
    /// - Network errors occur
    #[instrument(skip(self, code, verifier))]
    pub async fn exchange_code(&self, code: &str, verifier: &PkceVerifier) -> Result<OAuthTokens> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidAuthCode(
                "authorization code is empty".to_string(),
            ));
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];

        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http_client
            .execute_with_retry(self.token_request(&params)?, RetryPolicy::no_retry())
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = error_text(&response);

            warn!(
                status = status,
                error = %error_body,
                "Token exchange failed while exchanging authorization code"
            );

            return Err(AuthError::InvalidAuthCode(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::SerializationFailed {
                context: "token response".to_string(),
                reason: e.to_string(),
            }
        })?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(OAuthTokens::issued_at(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            self.clock.now(),
        ))
    }

    /// Refresh an access token using a refresh token.
    ///
    /// Retries 5xx/429 responses and transport failures with exponential
    /// backoff. 4xx responses (revoked or invalid grant) fail immediately.
    /// The returned token set keeps the old refresh token when the endpoint
    /// does not issue a new one.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Refreshing access token");

        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let failure = match self
                .http_client
                .execute_with_retry(self.token_request(&params)?, RetryPolicy::no_retry())
                .await
            {
                Ok(response) if response.is_success() => {
                    let token_response: TokenResponse = response.json().map_err(|e| {
                        AuthError::SerializationFailed {
                            context: "token response".to_string(),
                            reason: e.to_string(),
                        }
                    })?;

                    info!(
                        expires_in = token_response.expires_in,
                        "Refreshed access token"
                    );

                    return Ok(OAuthTokens::issued_at(
                        token_response.access_token,
                        token_response
                            .refresh_token
                            .or_else(|| Some(refresh_token.to_string())),
                        token_response.expires_in,
                        self.clock.now(),
                    ));
                }
                Ok(response) if !response.is_retryable() => {
                    let status = response.status;
                    let error_body = error_text(&response);

                    warn!(
                        status = status,
                        error = %error_body,
                        "Token refresh failed without retry"
                    );

                    return Err(AuthError::TokenRefreshFailed(format!(
                        "Token endpoint returned {}: {}",
                        status, error_body
                    )));
                }
                Ok(response) => format!("{} - {}", response.status, error_text(&response)),
                Err(e) => e.to_string(),
            };

            if attempts >= max_attempts {
                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {}",
                    attempts, failure
                )));
            }

            let delay = self.retry_policy.delay_for(attempts);
            warn!(
                attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }

    fn token_request(&self, params: &[(&str, &str)]) -> Result<HttpRequest> {
        let encoded_body = serde_urlencoded::to_string(params).map_err(|e| {
            AuthError::SerializationFailed {
                context: "token request".to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Bytes::from(encoded_body)),
        )
    }
}

fn error_text(response: &HttpResponse) -> String {
    response
        .text()
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}
