//! Lookup kinds and normalized lookup requests.
//!
//! A [`LookupRequest`] is what the gateway hands to the orchestrator after
//! normalizing its inputs: the country is uppercased and the code or query is
//! carried through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::CountryCode;

/// The operation a lookup performs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    /// Exact postal-code lookup.
    #[default]
    Postal,
    /// Free-text search.
    Search,
}

impl LookupKind {
    /// Returns the namespace used for this kind in cache keys and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postal => "postal",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized lookup: kind, country, and the verbatim code or query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupRequest {
    /// The operation to perform.
    pub kind: LookupKind,
    /// Uppercased country code.
    pub country: CountryCode,
    /// Postal code or free-text query, passed through unmodified.
    pub term: String,
}

impl LookupRequest {
    /// Creates a postal-code lookup request.
    #[must_use]
    pub fn postal(country: impl Into<CountryCode>, code: impl Into<String>) -> Self {
        Self {
            kind: LookupKind::Postal,
            country: country.into(),
            term: code.into(),
        }
    }

    /// Creates a free-text search request.
    #[must_use]
    pub fn search(country: impl Into<CountryCode>, query: impl Into<String>) -> Self {
        Self {
            kind: LookupKind::Search,
            country: country.into(),
            term: query.into(),
        }
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.country, self.term)
    }
}
