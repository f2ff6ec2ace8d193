#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/postalia/postalia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! GeoNames postal-code lookup provider.
//!
//! This crate implements the [`PostalProvider`] trait from `postal-core` for
//! the [GeoNames](https://www.geonames.org/export/web-services.html) web services.
//!
//! # Usage
//!
//! ```rust,ignore
//! use postal_geonames::GeoNamesProvider;
//! use postal_core::{CountryCode, PostalProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = GeoNamesProvider::new(Some("demo".to_string()));
//!
//!     let result = provider.lookup(&CountryCode::new("BR"), "01310100").await?;
//!     println!("{result:?}");
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use postal_core::{
    CountryCode, NormalizedResult, PostalError, PostalFields, PostalProvider, Result,
};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Registry identifier of this provider.
pub const PROVIDER_ID: &str = "geonames";

/// Configuration key holding the GeoNames account name.
pub const USERNAME_KEY: &str = "GEONAMES_USERNAME";

/// Base URL for the GeoNames web services.
pub const GEONAMES_BASE_URL: &str = "http://api.geonames.org";

/// Upper bound for a single GeoNames call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// GeoNames postal-code provider.
///
/// Requires a GeoNames username. Looking up without one is a configuration
/// error, raised before any request is made.
#[derive(Clone)]
pub struct GeoNamesProvider {
    client: Client,
    base_url: String,
    username: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for GeoNamesProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoNamesProvider")
            .field("base_url", &self.base_url)
            .field("username", &self.username.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeoNamesProvider {
    /// Create a new GeoNames provider with the given username.
    #[must_use]
    pub fn new(username: Option<String>) -> Self {
        Self::with_client(Client::new(), username)
    }

    /// Create a new GeoNames provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, username: Option<String>) -> Self {
        Self {
            client,
            base_url: GEONAMES_BASE_URL.to_string(),
            username,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the provider at another base URL (e.g. a premium endpoint or a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the lookup URL. Every parameter is percent-encoded.
    fn url(&self, country: &CountryCode, code: &str, username: &str) -> String {
        format!(
            "{}/postalCodeLookupJSON?postalcode={}&country={}&username={}",
            self.base_url,
            urlencoding::encode(code),
            urlencoding::encode(country.as_str()),
            urlencoding::encode(username),
        )
    }

    /// Make the GET request and parse the JSON body.
    async fn get(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(PostalError::UpstreamStatus {
                provider: PROVIDER_ID.to_string(),
                status: response.status().as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: Value =
            serde_json::from_str(&text).map_err(|e| PostalError::Parse(format!("{e}: {text}")))?;

        // GeoNames reports account and quota problems inside a 200 response
        if let Some(status) = body.get("status") {
            let message = status
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(PostalError::Upstream {
                provider: PROVIDER_ID.to_string(),
                message: message.to_string(),
            });
        }

        Ok(body)
    }

    fn transport_error(&self, error: reqwest::Error) -> PostalError {
        if error.is_timeout() {
            PostalError::Timeout {
                provider: PROVIDER_ID.to_string(),
                after: self.timeout,
            }
        } else {
            PostalError::Network(error.to_string())
        }
    }
}

impl Default for GeoNamesProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl PostalProvider for GeoNamesProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn description(&self) -> &str {
        "GeoNames - worldwide postal code lookup"
    }

    async fn lookup(&self, country: &CountryCode, code: &str) -> Result<Option<NormalizedResult>> {
        let username = self
            .username
            .as_deref()
            .filter(|username| !username.is_empty())
            .ok_or_else(|| PostalError::configuration(PROVIDER_ID, USERNAME_KEY))?;

        debug!(country = %country, code, "GeoNames lookup");
        let body = self.get(&self.url(country, code, username)).await?;

        Ok(parse_lookup(country, code, body))
    }
}

/// Map the first entry of a `postalCodeLookupJSON` response.
///
/// Returns `None` when the response carries no matches.
fn parse_lookup(country: &CountryCode, code: &str, mut body: Value) -> Option<NormalizedResult> {
    let first = match body.get_mut("postalcodes")?.as_array_mut()? {
        matches if matches.is_empty() => return None,
        matches => matches.swap_remove(0),
    };

    let text = |field: &str| {
        first
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };

    let fields = PostalFields {
        country: country.clone(),
        postal_code: text("postalCode")
            .or_else(|| text("postalcode"))
            .unwrap_or_else(|| code.to_string()),
        place_name: text("placeName"),
        admin_name1: text("adminName1"),
        lat: coordinate(first.get("lat")),
        lng: coordinate(first.get("lng")),
    };

    Some(NormalizedResult::structured(PROVIDER_ID, first, fields))
}

/// GeoNames serves coordinates as numbers, some mirrors as strings.
fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
