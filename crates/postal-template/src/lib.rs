#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/postalia/postalia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! URL-template provider for generic postal-code APIs.
//!
//! Many postal-code APIs differ only in where the country, the code and the
//! API key go in the request URL. [`TemplateProvider`] covers all of them
//! with a configured template such as
//! `https://api.example.com/v1/{country}/{code}?key={API_KEY}`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use postal_template::TemplateProvider;
//! use postal_core::{CountryCode, PostalProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = TemplateProvider::new(
//!         "openplz",
//!         Some("https://openplzapi.org/{country}/Localities?postalCode={code}".to_string()),
//!         None,
//!     );
//!
//!     let result = provider.lookup(&CountryCode::new("DE"), "10115").await?;
//!     println!("{result:?}");
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use postal_core::{CountryCode, NormalizedResult, PostalError, PostalProvider, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Placeholder replaced with the country code.
pub const COUNTRY_PLACEHOLDER: &str = "{country}";

/// Placeholder replaced with the postal code or query.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Placeholder replaced with the API key.
pub const API_KEY_PLACEHOLDER: &str = "{API_KEY}";

/// Upper bound for a single templated call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

/// Provider that fills a URL template and passes the upstream payload through.
///
/// Without a template the provider is disabled: lookups return `Ok(None)`
/// and no request is made. A missing API key is substituted as an empty
/// string.
#[derive(Clone)]
pub struct TemplateProvider {
    id: String,
    description: String,
    client: Client,
    template: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for TemplateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateProvider")
            .field("id", &self.id)
            .field("template", &self.template)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TemplateProvider {
    /// Create a new template provider.
    #[must_use]
    pub fn new(id: impl Into<String>, template: Option<String>, api_key: Option<String>) -> Self {
        Self::with_client(Client::new(), id, template, api_key)
    }

    /// Create a new template provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(
        client: Client,
        id: impl Into<String>,
        template: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        let id = id.into();
        Self {
            description: format!("{id} - templated postal code API"),
            id,
            client,
            template: template.filter(|t| !t.trim().is_empty()),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true if a template is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.template.is_some()
    }

    fn transport_error(&self, error: reqwest::Error) -> PostalError {
        if error.is_timeout() {
            PostalError::Timeout {
                provider: self.id.clone(),
                after: self.timeout,
            }
        } else {
            PostalError::Network(error.to_string())
        }
    }
}

/// Fill the first occurrence of each placeholder with its percent-encoded value.
#[must_use]
pub fn render_url(template: &str, country: &CountryCode, code: &str, api_key: &str) -> String {
    template
        .replacen(COUNTRY_PLACEHOLDER, &urlencoding::encode(country.as_str()), 1)
        .replacen(CODE_PLACEHOLDER, &urlencoding::encode(code), 1)
        .replacen(API_KEY_PLACEHOLDER, &urlencoding::encode(api_key), 1)
}

#[async_trait]
impl PostalProvider for TemplateProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn lookup(&self, country: &CountryCode, code: &str) -> Result<Option<NormalizedResult>> {
        let Some(template) = &self.template else {
            debug!(provider = %self.id, "No template configured, provider disabled");
            return Ok(None);
        };

        let url = render_url(
            template,
            country,
            code,
            self.api_key.as_deref().unwrap_or_default(),
        );
        debug!(provider = %self.id, country = %country, code, "Templated lookup");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(PostalError::UpstreamStatus {
                provider: self.id.clone(),
                status: response.status().as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if text.trim().is_empty() {
            return Ok(None);
        }

        // Non-JSON bodies are passed through as a string
        let raw = serde_json::from_str(&text).unwrap_or(Value::String(text));
        if raw.is_null() {
            return Ok(None);
        }

        Ok(Some(NormalizedResult::pass_through(self.id.clone(), raw)))
    }
}
