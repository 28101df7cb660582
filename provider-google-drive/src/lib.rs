//! # Google Drive Provider
//!
//! Implements the `SourceProvider` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Folder lookup by display name
//! - Listing of the files directly inside a folder, newest first
//! - Bearer authentication through a `CredentialProvider`
//! - Exponential backoff for rate limiting and server errors

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
