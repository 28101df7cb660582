//! # Authentication Module
//!
//! OAuth 2.0 credential acquisition and refresh for the Drive listing API.
//!
//! ## Overview
//!
//! - Parse the OAuth client descriptor (`credentials.json`)
//! - Authorization code flow with PKCE and the out-of-band redirect
//! - Token refresh with retry before expiry
//! - Token persistence via the `SecureStore` bridge
//! - [`CredentialProvider`] implementations for unattended and interactive runs

pub mod client;
pub mod error;
pub mod oauth;
pub mod provider;
pub mod token_store;
pub mod types;

pub use client::{ClientSecrets, DRIVE_METADATA_READONLY_SCOPE, OOB_REDIRECT_URI};
pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use provider::{
    authorize_interactively, CodePrompt, CredentialProvider, InteractiveProvider,
    StdinCodePrompt, StoredTokenProvider,
};
pub use token_store::{TokenStore, DEFAULT_USER_ID};
pub use types::OAuthTokens;
