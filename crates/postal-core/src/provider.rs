//! Provider trait for upstream postal-code APIs.
//!
//! Every upstream service is wrapped in a [`PostalProvider`]. Implementations
//! translate a normalized request into exactly one outbound call and the
//! response back into a [`NormalizedResult`].
//!
//! The return value separates three outcomes:
//!
//! - `Ok(Some(result))` - the provider has data
//! - `Ok(None)` - the provider has nothing (empty payload, or the provider is disabled)
//! - `Err(error)` - either [`PostalError::Configuration`](crate::PostalError::Configuration),
//!   which marks the provider as misconfigured, or an upstream failure, which
//!   callers treat the same as `Ok(None)`

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    request::{LookupKind, LookupRequest},
    types::{CountryCode, NormalizedResult},
};

/// Adapter for one upstream postal-code API.
#[async_trait]
pub trait PostalProvider: Send + Sync + Debug {
    /// Returns the registry identifier of this provider (e.g. "geonames").
    fn id(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Looks up a postal code.
    async fn lookup(&self, country: &CountryCode, code: &str) -> Result<Option<NormalizedResult>>;

    /// Runs a free-text search.
    ///
    /// Default implementation reuses the postal lookup call pattern with the
    /// query in place of the code. Providers with a dedicated search endpoint
    /// can override it.
    async fn search(
        &self,
        country: &CountryCode,
        query: &str,
    ) -> Result<Option<NormalizedResult>> {
        self.lookup(country, query).await
    }

    /// Dispatches a normalized request to [`lookup`](Self::lookup) or
    /// [`search`](Self::search).
    async fn fetch(&self, request: &LookupRequest) -> Result<Option<NormalizedResult>> {
        match request.kind {
            LookupKind::Postal => self.lookup(&request.country, &request.term).await,
            LookupKind::Search => self.search(&request.country, &request.term).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Echo {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PostalProvider for Echo {
        fn id(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the requested code"
        }

        async fn lookup(
            &self,
            country: &CountryCode,
            code: &str,
        ) -> Result<Option<NormalizedResult>> {
            self.seen.lock().unwrap().push(format!("{country}:{code}"));
            Ok(Some(NormalizedResult::pass_through(
                self.id(),
                json!({ "code": code }),
            )))
        }
    }

    #[tokio::test]
    async fn search_defaults_to_lookup_call_pattern() {
        let provider = Echo::default();
        let request = LookupRequest::search("br", "Paulista");

        let result = provider.fetch(&request).await.unwrap().unwrap();

        assert_eq!(result.raw, json!({ "code": "Paulista" }));
        assert_eq!(*provider.seen.lock().unwrap(), vec!["BR:Paulista".to_string()]);
    }
}
