//! # S3 Provider
//!
//! Implements the `ObjectStore` trait over `aws-sdk-s3`. Marker objects are
//! written with an empty body, `AES256` server-side encryption and the
//! `STANDARD_IA` storage class.
//!
//! Region and credentials come from the standard AWS environment chain. A
//! custom endpoint with path-style addressing supports S3-compatible stores.

pub mod error;
pub mod store;

pub use error::{Result, S3Error};
pub use store::{S3ObjectStore, S3Settings};
