//! # Mirror Module
//!
//! Orchestrates a single mirror run from a cloud folder into a bucket.
//!
//! ## Overview
//!
//! - Resolving the configured folder and listing its newest files
//! - Reading the bucket's existing keys, which act as the run ledger
//! - Selecting files that have no marker yet
//! - Writing a zero-byte marker per file and announcing it
//!
//! ## Components
//!
//! - **Diff** (`diff`): order-preserving set difference
//! - **Writer** (`writer`): put-then-notify per file with bounded concurrency
//! - **Report** (`report`): per-run summary and exit status
//! - **Coordinator** (`coordinator`): wires the stages together

pub mod coordinator;
pub mod diff;
pub mod error;
pub mod report;
pub mod writer;

pub use coordinator::MirrorCoordinator;
pub use diff::{select_new_files, MirrorCandidate};
pub use error::{
    Result, SyncError, EXIT_AUTHORIZATION, EXIT_CONFIGURATION, EXIT_FATAL, EXIT_PARTIAL_FAILURE,
};
pub use report::{FileOutcome, FileReport, MirrorReport, MirrorRunId};
pub use writer::MirrorWriter;
