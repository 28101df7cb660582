//! # Host Bridge Traits
//!
//! Capability traits the mirror core depends on, with concrete
//! implementations supplied by provider crates and `bridge-desktop`.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with timeouts and retry
//!
//! ### Mirror Capabilities
//! - [`SourceProvider`](source::SourceProvider) - Resolve a folder and list its files
//! - [`ObjectStore`](object_store::ObjectStore) - List keys and write zero-byte markers
//! - [`Notifier`](notify::Notifier) - Announce newly mirrored files
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - OAuth token persistence
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their library errors into it and keep the message actionable
//! (bucket name, folder id, HTTP status).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across concurrent per-file tasks.

pub mod error;
pub mod http;
pub mod notify;
pub mod object_store;
pub mod source;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use notify::{Notification, Notifier};
pub use object_store::{Encryption, KeyListing, MarkerObject, ObjectStore, StorageTier};
pub use source::{FolderMatch, SourceFile, SourceProvider};
pub use storage::SecureStore;
pub use time::{Clock, FixedClock, SystemClock};
