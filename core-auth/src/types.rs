use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds before expiry at which a token is already treated as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth 2.0 token set.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug`
/// implementation redacts them.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
/// use chrono::{Duration, Utc};
///
/// let tokens = OAuthTokens {
///     access_token: "ya29.a0...".to_string(),
///     refresh_token: Some("1//0g...".to_string()),
///     expires_at: Utc::now() + Duration::hours(1),
/// };
///
/// assert!(!tokens.is_expired_at(Utc::now()));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens. Google only
    /// returns one on the first consent.
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Create a token set issued at `issued_at` and valid for `expires_in`
    /// seconds.
    pub fn issued_at(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: issued_at + Duration::seconds(expires_in),
        }
    }

    /// Create a token set issued now.
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self::issued_at(access_token, refresh_token, expires_in, Utc::now())
    }

    /// Whether the token is expired, or will be within
    /// [`EXPIRY_BUFFER_SECS`], at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(EXPIRY_BUFFER_SECS)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
