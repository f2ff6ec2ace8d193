#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/postalia/postalia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Unified postal-code lookup across multiple providers.
//!
//! This crate re-exports the core types and the adapter implementations, and
//! provides a [`ProviderRegistry`] of known providers, a [`ProviderChain`]
//! that tries them in a configured order, and a [`PostalService`] that puts a
//! cache in front of the chain.
//!
//! # Features
//!
//! - `geonames` - GeoNames adapter with structured normalization
//! - `template` - URL-template adapters with pass-through normalization
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use postal::{CountryCode, InMemoryCache, PostalService, ProviderOrder, ProviderSettings};
//!
//! #[tokio::main]
//! async fn main() -> postal::Result<()> {
//!     let settings = ProviderSettings::new(ProviderOrder::parse("geonames,openplz"))
//!         .with_credential("GEONAMES_USERNAME", "demo")
//!         .with_credential("OPENPLZ_TEMPLATE", "https://openplzapi.org/{country}/Localities?postalCode={code}");
//!
//!     let service = PostalService::from_settings(&settings, Arc::new(InMemoryCache::default()));
//!
//!     if let Some(lookup) = service.postal(&CountryCode::new("de"), "10115").await? {
//!         println!("{:?}", lookup.data);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use postal_core::*;

// Cache implementations
pub use postal_cache::{InMemoryCache, NoopCache, default_check_period, spawn_sweeper};

// Adapters
#[cfg(feature = "geonames")]
pub use postal_geonames::GeoNamesProvider;
#[cfg(feature = "template")]
pub use postal_template::TemplateProvider;

mod chain;
mod registry;
mod service;
mod settings;

pub use chain::{Attempt, AttemptOutcome, ProviderChain, Resolution};
pub use registry::{
    AdapterKind, CATALOG, CatalogEntry, ProviderDescriptor, ProviderRegistry, catalog_config_keys,
};
pub use service::{Lookup, PostalService};
pub use settings::{DEFAULT_CHAIN_DEADLINE, DEFAULT_ORDER, ProviderOrder, ProviderSettings};
