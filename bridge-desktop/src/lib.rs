//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for the machines the mirror job
//! runs on (cron hosts, containers, developer laptops).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` backed by a JSON token file (default)
//! - `SecureStore` using the `keyring` crate (OS keychain)
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
//! use std::time::Duration;
//!
//! let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(30))?;
//! let tokens = FileSecureStore::new("credentials/token.json");
//! ```

mod http;
mod token_file;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use token_file::FileSecureStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
