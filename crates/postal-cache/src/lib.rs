#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/postalia/postalia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for postal lookup results.
//!
//! This crate provides implementations of the [`LookupCache`] trait from `postal-core`:
//!
//! - [`InMemoryCache`] - TTL-bounded in-process cache
//! - [`NoopCache`] - No-op cache that doesn't store anything
//!
//! Expired entries are never served. They are dropped lazily on read and in
//! bulk by the task started with [`spawn_sweeper`].

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;
/// Periodic expiry sweep.
pub mod sweep;

// Re-export the trait for convenience
pub use postal_core::LookupCache;

// Re-export implementations
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use sweep::{default_check_period, spawn_sweeper};
