//! # Slack Provider
//!
//! Implements the `Notifier` trait with a Slack incoming webhook.

pub mod error;
pub mod webhook;

pub use error::{Result, SlackError};
pub use webhook::SlackWebhookNotifier;
