#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/postalia/postalia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for postal-code lookup providers.
//!
//! This crate provides the foundational abstractions for the lookup aggregator:
//!
//! - [`PostalProvider`](provider::PostalProvider) - Adapter contract for an upstream API
//! - [`LookupCache`](cache::LookupCache) - Caching abstraction for successful lookups
//! - [`NormalizedResult`](types::NormalizedResult) - Uniform result shape
//! - [`LookupRequest`](request::LookupRequest) - Normalized country + code/query pair

/// Cache trait and cache key construction.
pub mod cache;
/// Error types for lookup operations.
pub mod error;
/// Provider trait for upstream adapters.
pub mod provider;
/// Lookup kinds and normalized requests.
pub mod request;
/// Core data types (CountryCode, NormalizedResult, PostalFields).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CacheKey, LookupCache};
pub use error::{PostalError, Result};
pub use provider::PostalProvider;
pub use request::{LookupKind, LookupRequest};
pub use types::{CountryCode, Normalized, NormalizedResult, PostalFields};
