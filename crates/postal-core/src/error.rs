//! Error types for lookup operations.
//!
//! [`PostalError`] separates the two failure families an adapter can report:
//! misconfiguration of the provider itself, which is fatal for that provider,
//! and upstream failures, which callers treat the same as "no data".

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while looking up postal data.
#[derive(Error, Debug)]
pub enum PostalError {
    /// A configuration value the provider needs is not set.
    #[error("Provider {provider} is not configured: missing {key}")]
    Configuration {
        /// Identifier of the misconfigured provider.
        provider: String,
        /// Name of the missing configuration key.
        key: String,
    },

    /// Network-related errors (connection failures, DNS, broken bodies).
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream call did not complete within the provider timeout.
    #[error("Provider {provider} timed out after {after:?}")]
    Timeout {
        /// Identifier of the provider that timed out.
        provider: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The upstream answered with a non-success HTTP status.
    #[error("Provider {provider} answered HTTP {status}")]
    UpstreamStatus {
        /// Identifier of the provider.
        provider: String,
        /// HTTP status code returned by the upstream.
        status: u16,
    },

    /// The upstream answered successfully but reported an error in its payload.
    #[error("Provider {provider} reported an error: {message}")]
    Upstream {
        /// Identifier of the provider.
        provider: String,
        /// Error message reported by the upstream.
        message: String,
    },

    /// Error parsing the upstream payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache backend.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl PostalError {
    /// Creates a configuration error for `provider` missing `key`.
    #[must_use]
    pub fn configuration(provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.into(),
            key: key.into(),
        }
    }

    /// Returns true if this error signals provider misconfiguration.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns true if this error came from talking to an upstream provider.
    ///
    /// Upstream errors are equivalent to "no data" for fallback purposes.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout { .. }
                | Self::UpstreamStatus { .. }
                | Self::Upstream { .. }
                | Self::Parse(_)
        )
    }
}

/// Result type alias using [`PostalError`].
pub type Result<T> = std::result::Result<T, PostalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_errors() {
        let err = PostalError::configuration("geonames", "GEONAMES_USERNAME");
        assert!(err.is_configuration());
        assert!(!err.is_upstream());
        assert_eq!(
            err.to_string(),
            "Provider geonames is not configured: missing GEONAMES_USERNAME"
        );
    }

    #[test]
    fn classifies_upstream_errors() {
        let status = PostalError::UpstreamStatus {
            provider: "zipbase".to_string(),
            status: 503,
        };
        assert!(status.is_upstream());
        assert!(PostalError::Network("connection reset".to_string()).is_upstream());
        assert!(PostalError::Parse("expected value".to_string()).is_upstream());
        assert!(!PostalError::Cache("poisoned".to_string()).is_upstream());
    }
}
