//! OAuth client descriptor
//!
//! Parses the `credentials.json` file downloaded from the Google Cloud
//! console. Both "installed" (desktop) and "web" client types are accepted.

use crate::error::{AuthError, Result};
use crate::oauth::OAuthConfig;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Out-of-band redirect: the consent page shows the code for manual copy.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
pub const DRIVE_METADATA_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/drive.metadata.readonly";

#[derive(Deserialize)]
struct DescriptorFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

/// OAuth client id and endpoints.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ClientSecrets {
    /// Parse a descriptor document.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let file: DescriptorFile = serde_json::from_slice(data)
            .map_err(|e| AuthError::ClientDescriptor(format!("invalid JSON: {}", e)))?;

        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::ClientDescriptor(
                "expected an \"installed\" or \"web\" client section".to_string(),
            )
        })?;

        if secrets.client_id.trim().is_empty() {
            return Err(AuthError::ClientDescriptor(
                "client_id is empty".to_string(),
            ));
        }

        Ok(secrets)
    }

    /// Read and parse a descriptor file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AuthError::ClientDescriptor(format!("cannot read {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Loaded OAuth client descriptor");
        Self::from_json(&data)
    }

    /// The redirect URI used for the consent flow: the first one the
    /// descriptor lists, falling back to the out-of-band URI.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
            .unwrap_or(OOB_REDIRECT_URI)
    }

    /// Flow configuration requesting read-only Drive metadata access.
    pub fn into_oauth_config(self) -> OAuthConfig {
        let redirect_uri = self.redirect_uri().to_string();
        OAuthConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri,
            scopes: vec![DRIVE_METADATA_READONLY_SCOPE.to_string()],
            auth_url: self.auth_uri,
            token_url: self.token_uri,
        }
    }
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}
