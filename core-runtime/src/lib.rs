//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the mirror job:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast validation
//!
//! ## Overview
//!
//! Every other crate in the workspace depends on this one for the shared
//! configuration type and logging conventions.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{DedupStrategy, MirrorConfig, MirrorConfigBuilder, TokenStoreKind};
pub use error::{Error, Result};
